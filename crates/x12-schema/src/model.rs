//! Schema model definitions
#![allow(clippy::must_use_candidate)] // Builders and accessors read clearly without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use crate::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

static SEGMENT_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("identifier pattern compiles"));

/// Check that a segment identifier is usable in a declaration
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] for empty identifiers or identifiers
/// containing anything other than ASCII letters and digits.
pub fn validate_identifier(identifier: &str, context: &str) -> Result<()> {
    if SEGMENT_IDENTIFIER.is_match(identifier) {
        Ok(())
    } else {
        Err(Error::invalid_identifier(identifier, context))
    }
}

/// A declared repeating pattern of segment identifiers
///
/// The pattern is never empty and its identifiers are validated on every
/// mutation. Duplicate identifiers are allowed: a loop may contain two `REF`
/// or two `DTP` segments per repetition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopSpec {
    position: usize,
    pattern: Vec<String>,
}

impl LoopSpec {
    /// Declare a loop at `position` with the given identifier pattern
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPattern`] or [`Error::InvalidIdentifier`].
    pub fn new<I, S>(position: usize, pattern: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = Self {
            position,
            pattern: pattern.into_iter().map(Into::into).collect(),
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(Error::EmptyPattern {
                position: self.position,
            });
        }

        let context = format!("loop {}", self.position);
        for identifier in &self.pattern {
            validate_identifier(identifier, &context)?;
        }
        Ok(())
    }

    /// Position key under which loop branches reference this loop
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the declaration to another position key
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Ordered identifier pattern
    pub fn identifiers(&self) -> &[String] {
        &self.pattern
    }

    /// Identifier that opens each repetition
    pub fn first_identifier(&self) -> &str {
        &self.pattern[0]
    }

    /// Identifier that closes each repetition
    pub fn last_identifier(&self) -> &str {
        &self.pattern[self.pattern.len() - 1]
    }

    /// Number of segments in one repetition
    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Whether a segment name belongs to the pattern
    pub fn contains(&self, name: &str) -> bool {
        self.pattern.iter().any(|identifier| identifier == name)
    }

    /// Append one identifier to the pattern
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a malformed identifier.
    pub fn add_segment_identifier(mut self, identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        validate_identifier(&identifier, &format!("loop {}", self.position))?;
        self.pattern.push(identifier);
        Ok(self)
    }

    /// Append several identifiers to the pattern
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for the first malformed identifier.
    pub fn add_segment_identifiers<I, S>(self, identifiers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        identifiers
            .into_iter()
            .try_fold(self, |spec, identifier| spec.add_segment_identifier(identifier))
    }

    /// Remove every occurrence of an identifier from the pattern
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPattern`] when nothing would remain.
    pub fn remove_segment_identifier(mut self, identifier: &str) -> Result<Self> {
        self.pattern.retain(|s| s != identifier);
        self.validate()?;
        Ok(self)
    }
}

/// Field-value check used to pick among same-named segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Qualifier {
    /// Zero-based index of the qualifier field
    pub index: usize,
    /// Expected qualifier text
    pub value: String,
}

/// Resolves one scalar from a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldLeaf {
    /// Identifier of the segment to read from
    pub segment: String,
    /// Optional qualifier check; absent means the first match is used as is
    pub qualifier: Option<Qualifier>,
    /// Zero-based index of the field to read
    pub value_index: usize,
}

impl FieldLeaf {
    /// Unconditional leaf reading `fields[value_index]` of `segment`
    pub fn new(segment: impl Into<String>, value_index: usize) -> Self {
        Self {
            segment: segment.into(),
            qualifier: None,
            value_index,
        }
    }

    /// Require `fields[index] == value` on the selected segment
    pub fn qualified(mut self, index: usize, value: impl Into<String>) -> Self {
        self.qualifier = Some(Qualifier {
            index,
            value: value.into(),
        });
        self
    }

    /// Index of the qualifier field, if any
    pub fn qualifier_index(&self) -> Option<usize> {
        self.qualifier.as_ref().map(|q| q.index)
    }

    /// Expected qualifier text, if any
    pub fn qualifier_value(&self) -> Option<&str> {
        self.qualifier.as_ref().map(|q| q.value.as_str())
    }
}

/// Resolves a sub-object once per instance of a declared loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopBranch {
    /// Position of the referenced [`LoopSpec`]
    pub loop_ref: usize,
    /// Schema applied to each loop instance
    pub fields: SchemaObject,
}

impl LoopBranch {
    /// Branch mapping `fields` over every instance of loop `loop_ref`
    pub fn new(loop_ref: usize, fields: SchemaObject) -> Self {
        Self { loop_ref, fields }
    }
}

/// One node of a schema tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    Leaf(FieldLeaf),
    Branch(LoopBranch),
    Object(SchemaObject),
}

impl From<FieldLeaf> for SchemaNode {
    fn from(leaf: FieldLeaf) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<LoopBranch> for SchemaNode {
    fn from(branch: LoopBranch) -> Self {
        Self::Branch(branch)
    }
}

impl From<SchemaObject> for SchemaNode {
    fn from(object: SchemaObject) -> Self {
        Self::Object(object)
    }
}

/// Ordered set of keyed schema nodes
///
/// Keys are unique; inserting an existing key replaces its node in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaObject {
    entries: Vec<(String, SchemaNode)>,
}

impl SchemaObject {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SchemaObject::insert`]
    pub fn with(mut self, key: impl Into<String>, node: impl Into<SchemaNode>) -> Self {
        self.insert(key, node);
        self
    }

    /// Insert or replace the node stored under `key`
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<SchemaNode>) {
        let key = key.into();
        let node = node.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = node,
            None => self.entries.push((key, node)),
        }
    }

    /// Node stored under `key`
    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.entries.iter().map(|(k, node)| (k.as_str(), node))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the object has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A complete mapping declaration: loops plus the output schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingSchema {
    /// Schema name, also the registry key
    pub name: String,
    /// Loops the branches of `root` may reference
    pub loops: Vec<LoopSpec>,
    /// Output schema
    pub root: SchemaObject,
}

impl MappingSchema {
    /// Build and validate a mapping schema
    ///
    /// # Errors
    ///
    /// Returns an error when loop positions repeat, a leaf names a malformed
    /// segment identifier, or a branch references an undeclared loop.
    pub fn new(name: impl Into<String>, loops: Vec<LoopSpec>, root: SchemaObject) -> Result<Self> {
        let schema = Self {
            name: name.into(),
            loops,
            root,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Re-check the cross references of the schema
    ///
    /// # Errors
    ///
    /// See [`MappingSchema::new`].
    pub fn validate(&self) -> Result<()> {
        let mut positions = HashSet::new();
        for spec in &self.loops {
            if !positions.insert(spec.position()) {
                return Err(Error::DuplicateLoop(spec.position()));
            }
        }

        validate_object(&self.root, "", &positions)
    }

    /// Declared loop at a position
    pub fn loop_at(&self, position: usize) -> Option<&LoopSpec> {
        self.loops.iter().find(|spec| spec.position() == position)
    }
}

/// Join a parent path and a key into a dotted path.
pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn validate_object(object: &SchemaObject, path: &str, positions: &HashSet<usize>) -> Result<()> {
    for (key, node) in object.iter() {
        let path = child_path(path, key);
        match node {
            SchemaNode::Leaf(leaf) => validate_identifier(&leaf.segment, &path)?,
            SchemaNode::Branch(branch) => {
                if !positions.contains(&branch.loop_ref) {
                    return Err(Error::UndeclaredLoop {
                        path,
                        position: branch.loop_ref,
                    });
                }
                validate_object(&branch.fields, &path, positions)?;
            }
            SchemaNode::Object(nested) => validate_object(nested, &path, positions)?,
        }
    }
    Ok(())
}
