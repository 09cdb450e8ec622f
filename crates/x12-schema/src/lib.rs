//! # x12-schema
//!
//! Declarative mapping schemas for flat X12-style documents.
//!
//! A schema is a tree whose nodes are either a [`FieldLeaf`] (resolve one
//! scalar from a segment), a [`LoopBranch`] (resolve a sub-object once per
//! extracted loop instance) or a nested [`SchemaObject`]. Loops are declared
//! as [`LoopSpec`]s: a position key plus an ordered pattern of segment
//! identifiers.
//!
//! Malformed declarations are integration-time bugs and fail fast with
//! [`Error`].

pub mod loader;
pub mod model;
pub mod registry;

pub use loader::SchemaLoader;
pub use model::{
    FieldLeaf, LoopBranch, LoopSpec, MappingSchema, Qualifier, SchemaNode, SchemaObject,
};
pub use registry::SchemaRegistry;

use thiserror::Error;

/// Errors raised by malformed schema or loop declarations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Loop {position} has an empty segment pattern")]
    EmptyPattern { position: usize },

    #[error("Invalid segment identifier '{identifier}' in {context}")]
    InvalidIdentifier { identifier: String, context: String },

    #[error("Invalid schema node at '{path}': {reason}")]
    InvalidNode { path: String, reason: String },

    #[error("Loop position {0} is declared more than once")]
    DuplicateLoop(usize),

    #[error("Loop branch at '{path}' references undeclared loop {position}")]
    UndeclaredLoop { path: String, position: usize },

    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an invalid-node error with the dotted path of the node.
    pub fn invalid_node(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build an invalid-identifier error with declaration context.
    pub fn invalid_identifier(identifier: impl Into<String>, context: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
            context: context.into(),
        }
    }
}

/// Crate-local result type for schema operations.
pub type Result<T> = std::result::Result<T, Error>;
