//! Transaction orchestration
//!
//! A [`Transaction`] owns one ingested [`Document`] and the loops declared
//! against it. Data flows one way: raw text becomes a document, extraction
//! fills the declared loops, and mapping reads both.
#![allow(clippy::must_use_candidate)] // Accessors are clear at call sites without #[must_use].

use serde_json::{Map, Value, json};
use tracing::{debug, info, trace};
use x12_ir::{Document, Field, Segment};
use x12_mapping::{LoopSet, MappingEngine, infer_pattern};
use x12_schema::{LoopSpec, MappingSchema, SchemaObject};

use crate::{Result, TransactionConfig};

/// One transaction document with its declared loops
#[derive(Debug, Clone)]
pub struct Transaction {
    document: Document,
    loops: LoopSet,
    config: TransactionConfig,
}

impl Transaction {
    /// Ingest raw text with the default configuration
    pub fn from_text(text: &str) -> Self {
        Self::with_config(text, TransactionConfig::default())
    }

    /// Ingest raw text with an explicit configuration
    pub fn with_config(text: &str, config: TransactionConfig) -> Self {
        let document = Document::parse_with(text, config.delimiters);
        let transaction = Self {
            document,
            loops: LoopSet::new(),
            config,
        };
        transaction.log_step("Ingested transaction", transaction.document.len());
        transaction
    }

    /// Wrap an already-built document
    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            loops: LoopSet::new(),
            config: TransactionConfig::default(),
        }
    }

    fn log_step(&self, step: &str, count: usize) {
        if self.config.debug {
            debug!(count, "{}", step);
        } else {
            trace!(count, "{}", step);
        }
    }

    /// The ingested document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// All segments in source order
    pub fn segments(&self) -> &[Segment] {
        self.document.segments()
    }

    /// Identifiers of all segments, in source order
    pub fn segment_names(&self) -> Vec<&str> {
        self.document.segment_names()
    }

    /// Configuration used at ingest
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Declared loops with their extracted contents
    pub fn loops(&self) -> &LoopSet {
        &self.loops
    }

    /// Declare a loop; call [`Transaction::run_loops`] to extract it
    ///
    /// # Errors
    ///
    /// Returns a schema error when the position is already declared.
    pub fn add_loop(&mut self, spec: LoopSpec) -> Result<()> {
        self.loops.declare(spec)?;
        Ok(())
    }

    /// Extract every declared loop, replacing previous contents
    pub fn run_loops(&mut self) {
        self.loops.run_all(self.document.segments());
        self.log_step("Ran loops", self.loops.len());
    }

    /// Declare a loop made of the repeating segment identifiers and extract it
    ///
    /// Returns the position of the new loop, or `None` when no identifier
    /// repeats.
    ///
    /// # Errors
    ///
    /// Returns a schema error when a repeating identifier is not a valid
    /// segment identifier.
    pub fn infer_loops(&mut self) -> Result<Option<usize>> {
        let Some(pattern) = infer_pattern(self.document.segments()) else {
            debug!("No repeating segments to infer a loop from");
            return Ok(None);
        };

        let position = self.loops.next_position();
        info!(position, pattern = ?pattern, "Inferred loop");
        self.add_loop(LoopSpec::new(position, pattern)?)?;
        self.run_loops();
        Ok(Some(position))
    }

    /// Transaction-set type from the `ST` segment
    ///
    /// # Errors
    ///
    /// Returns a structural error when there is no `ST` segment or it carries
    /// no fields.
    pub fn transaction_type(&self) -> Result<&Field> {
        Ok(self.document.transaction_type()?)
    }

    /// Map a schema against the whole document
    pub fn map_segments(&self, schema: &SchemaObject) -> Map<String, Value> {
        MappingEngine::new(&self.loops).map_document(schema, &self.document)
    }

    /// Map a schema against an explicit segment scope
    pub fn map_scope(&self, schema: &SchemaObject, scope: &[Segment]) -> Map<String, Value> {
        MappingEngine::new(&self.loops).map(schema, scope)
    }

    /// Declare the schema's loops, extract them and map the schema
    ///
    /// Loops already declared with the same pattern are reused, so applying a
    /// schema twice yields the same result.
    ///
    /// # Errors
    ///
    /// Returns a schema error when one of the schema's loop positions is
    /// already declared with a different pattern. Nothing is declared in
    /// that case.
    pub fn apply(&mut self, schema: &MappingSchema) -> Result<Value> {
        let mut pending = Vec::new();
        for spec in &schema.loops {
            match self.loops.get(spec.position()) {
                Some(declared) if declared == spec => {}
                Some(_) => return Err(x12_schema::Error::DuplicateLoop(spec.position()).into()),
                None => pending.push(spec.clone()),
            }
        }

        for spec in pending {
            self.add_loop(spec)?;
        }
        self.run_loops();

        let result = self.map_segments(&schema.root);
        info!(schema = %schema.name, keys = result.len(), "Mapped transaction");
        Ok(Value::Object(result))
    }

    /// Debug dump of segments and loops with their contents
    pub fn to_json(&self) -> Value {
        let loops: Vec<&x12_mapping::loops::LoopEntry> = self.loops.iter().collect();
        json!({
            "segments": self.document.segments(),
            "loops": loops,
        })
    }
}
