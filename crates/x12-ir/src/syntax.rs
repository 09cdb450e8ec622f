//! Delimiter definitions for X12-style documents

use serde::{Deserialize, Serialize};

/// Default record separator
pub const DEFAULT_SEGMENT_SEPARATOR: char = '\n';
/// Default field separator
pub const DEFAULT_ELEMENT_SEPARATOR: char = '*';
/// Characters removed from every field after whitespace trimming
pub const STRIPPED_CHARACTERS: [char; 4] = ['\n', '\t', '\r', '~'];

/// Separators used when splitting raw text into segments and fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    /// Record separator (default '\n')
    pub segment: char,
    /// Field separator (default '*')
    pub element: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            segment: DEFAULT_SEGMENT_SEPARATOR,
            element: DEFAULT_ELEMENT_SEPARATOR,
        }
    }
}

impl Delimiters {
    /// Create delimiters from explicit separators
    #[must_use]
    pub fn new(segment: char, element: char) -> Self {
        Self { segment, element }
    }
}
