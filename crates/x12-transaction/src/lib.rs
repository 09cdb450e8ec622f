#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # x12-transaction
//!
//! Transaction facade: owns one ingested document and its declared loops and
//! sequences ingest, loop extraction and mapping.
//!
//! Only the transaction-type lookup enforces document structure; everything
//! else degrades to partial output.

pub mod config;
pub mod transaction;

pub use config::TransactionConfig;
pub use transaction::Transaction;

use thiserror::Error;

/// Errors surfaced by the transaction facade
#[derive(Error, Debug)]
pub enum Error {
    #[error("Structural error: {0}")]
    Structural(#[from] x12_ir::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] x12_schema::Error),

    #[error("Configuration error in '{path}': {message}")]
    Config { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error with source path context.
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Crate-local result type for transaction operations.
pub type Result<T> = std::result::Result<T, Error>;
