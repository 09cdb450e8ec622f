//! Transaction configuration
#![allow(clippy::must_use_candidate)] // Constructors are clear at call sites without #[must_use].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use x12_ir::Delimiters;

/// Configuration for ingesting and mapping one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionConfig {
    /// Record and field separators used during ingest
    pub delimiters: Delimiters,
    /// Emit orchestration detail at `debug` instead of `trace`
    pub debug: bool,
}

impl TransactionConfig {
    /// Configuration with explicit delimiters
    pub fn with_delimiters(delimiters: Delimiters) -> Self {
        Self {
            delimiters,
            ..Self::default()
        }
    }

    /// Parse configuration from YAML
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed YAML, unknown keys or a field
    /// separator equal to the record separator.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| Error::config("<inline>", e.to_string()))?;
        config.validate("<inline>")?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an IO error when the file cannot be read and
    /// [`Error::Config`] when its content is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let source = path.display().to_string();
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::config(&source, e.to_string()))?;
        config.validate(&source)?;
        Ok(config)
    }

    fn validate(&self, source: &str) -> Result<()> {
        if self.delimiters.segment == self.delimiters.element {
            return Err(Error::config(
                source,
                format!(
                    "segment and element delimiters must differ, both are {:?}",
                    self.delimiters.segment
                ),
            ));
        }
        Ok(())
    }
}
