#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # x12-ir
//!
//! In-memory representation of flat, delimiter-based transaction documents.
//!
//! A raw document is a list of records separated by line breaks, each record
//! being a segment name followed by `*`-separated fields. This crate turns
//! such text into an ordered [`Document`] of [`Segment`]s and offers the one
//! mandatory structural check of the system: locating the transaction-set
//! type in the `ST` segment.

/// Document container and ingest.
pub mod document;
/// Scalar field tokens and their trim rule.
pub mod field;
/// Named, ordered field sequences.
pub mod segment;
/// Record and field delimiters.
pub mod syntax;

/// Primary document type.
pub use document::Document;
/// Scalar token held by a segment.
pub use field::Field;
/// One record of a document.
pub use segment::Segment;
/// Delimiters used during ingest.
pub use syntax::Delimiters;

use thiserror::Error;

/// Structural errors raised by mandatory document checks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("No {name} segment found")]
    MissingSegment { name: String },

    #[error("Segment {segment} has no element at index {index}")]
    MissingElement { segment: String, index: usize },
}

impl Error {
    /// Build a missing-segment error for the given identifier.
    pub fn missing_segment(name: impl Into<String>) -> Self {
        Self::MissingSegment { name: name.into() }
    }

    /// Build a missing-element error with segment context.
    pub fn missing_element(segment: impl Into<String>, index: usize) -> Self {
        Self::MissingElement {
            segment: segment.into(),
            index,
        }
    }
}

/// Crate-local result type for IR operations.
pub type Result<T> = std::result::Result<T, Error>;
