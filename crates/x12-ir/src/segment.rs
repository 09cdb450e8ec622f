//! Segment records
#![allow(clippy::must_use_candidate)] // Accessors are clear at call sites without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builders return Self for chaining.

use crate::field::{clean, Field};
use crate::syntax::Delimiters;
use serde::{Deserialize, Serialize};

/// One record of a document: a name code followed by ordered fields
///
/// Field order is significant; every index into a segment is zero-based and
/// counts only the fields after the name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Segment {
    /// Segment identifier (e.g. `ST`, `INS`, `REF`)
    pub name: String,

    /// Fields in order of appearance
    pub fields: Vec<Field>,
}

impl Segment {
    /// Create a segment with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Create a segment from a name and field values
    pub fn with_fields<I, F>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Split one raw record into a segment.
    ///
    /// The first token is the name, the rest become trimmed fields. An empty
    /// line yields a segment with an empty name and no fields.
    pub(crate) fn parse_line(line: &str, delimiters: Delimiters) -> Self {
        let mut tokens = line.split(delimiters.element);
        let name = tokens.next().map(clean).unwrap_or_default();
        let fields = tokens.map(Field::trimmed).collect();
        Self { name, fields }
    }

    /// Append a field
    pub fn add_field(mut self, field: impl Into<Field>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// All fields of the segment
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field at a zero-based index
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Element text at a zero-based index
    pub fn element(&self, index: usize) -> Option<&str> {
        self.field(index).map(Field::as_str)
    }

    /// Whether the segment carries this identifier
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the segment has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Re-apply the field trim rule to every field
    pub fn trim_fields(&mut self) {
        for field in &mut self.fields {
            field.trim();
        }
    }
}
