//! Field tokens
#![allow(clippy::must_use_candidate)] // Constructors read clearly without #[must_use].

use crate::syntax::STRIPPED_CHARACTERS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single delimited scalar value within a segment
///
/// Serializes as its bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field {
    /// Raw element text
    pub element: String,
}

impl Field {
    /// Create a field from raw text without trimming
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
        }
    }

    /// Create a field and apply [`Field::trim`] immediately
    pub fn trimmed(element: impl Into<String>) -> Self {
        let mut field = Self::new(element);
        field.trim();
        field
    }

    /// Remove surrounding whitespace, then strip `\n`, `\t`, `\r` and `~`
    /// anywhere in what remains.
    pub fn trim(&mut self) -> &mut Self {
        self.element = clean(&self.element);
        self
    }

    /// Borrow the element text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.element
    }

    /// Length of the element in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.element.len()
    }

    /// Whether the element is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.element.is_empty()
    }
}

/// Apply the field trim rule to a token.
pub(crate) fn clean(token: &str) -> String {
    token
        .trim()
        .chars()
        .filter(|c| !STRIPPED_CHARACTERS.contains(c))
        .collect()
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.element)
    }
}

impl From<&str> for Field {
    fn from(element: &str) -> Self {
        Self::new(element)
    }
}

impl From<String> for Field {
    fn from(element: String) -> Self {
        Self::new(element)
    }
}

impl PartialEq<str> for Field {
    fn eq(&self, other: &str) -> bool {
        self.element == other
    }
}

impl PartialEq<&str> for Field {
    fn eq(&self, other: &&str) -> bool {
        self.element == *other
    }
}
