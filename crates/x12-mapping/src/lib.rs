//! # x12-mapping
//!
//! Loop extraction and the declarative mapping engine.
//!
//! [`loops::extract`] groups a flat segment list into fixed-size loop
//! instances; [`MappingEngine`] folds a schema tree over a segment scope and
//! the extracted loops to build a JSON object. Neither step fails on
//! imperfect documents: unresolved references are left out of the output.

pub mod loops;
pub mod runtime;

pub use loops::{LoopInstance, LoopSet, extract, infer_pattern};
pub use runtime::MappingEngine;
