//! Schema file loader
//!
//! Mapping schemas are static configuration written in YAML or JSON:
//!
//! ```yaml
//! name: benefit_enrollment
//! loops:
//!   - position: 0
//!     segments: [INS, REF]
//! schema:
//!   transaction_type: { segment: ST, value: 0 }
//!   members:
//!     loop: 0
//!     fields:
//!       subscriber_indicator: { segment: INS, value: 0 }
//!       subscriber_number: { segment: REF, qualifier_index: 0, qualifier_value: "0F", value: 1 }
//! ```
//!
//! A mapping node with a `segment` key is a field leaf, one with a `loop` key
//! is a loop branch and any other mapping is a nested object. The node kind is
//! decided here, once; the mapping engine never inspects raw values.

use crate::model::{
    FieldLeaf, LoopBranch, LoopSpec, MappingSchema, SchemaNode, SchemaObject, child_path,
};
use crate::registry::SchemaRegistry;
use crate::{Error, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

const LEAF_KEYS: [&str; 4] = ["segment", "value", "qualifier_index", "qualifier_value"];
const BRANCH_KEYS: [&str; 2] = ["loop", "fields"];
const SCHEMA_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Serializable mapping schema format for loading from files
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    name: String,
    #[serde(default)]
    loops: Vec<LoopFile>,
    #[serde(default)]
    schema: Mapping,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoopFile {
    position: usize,
    segments: Vec<Value>,
}

impl LoopFile {
    fn into_spec(self) -> Result<LoopSpec> {
        let context = format!("loop {}", self.position);
        let identifiers = self
            .segments
            .into_iter()
            .map(|value| match value {
                Value::String(identifier) => Ok(identifier),
                other => Err(Error::invalid_identifier(describe(&other), context.as_str())),
            })
            .collect::<Result<Vec<_>>>()?;

        LoopSpec::new(self.position, identifiers)
    }
}

/// Loader for mapping schema files with a name-keyed cache
pub struct SchemaLoader {
    registry: SchemaRegistry,
    schema_paths: Vec<PathBuf>,
}

impl SchemaLoader {
    /// Create a new schema loader with the given search paths
    pub fn new(schema_paths: Vec<PathBuf>) -> Self {
        Self {
            registry: SchemaRegistry::new(),
            schema_paths,
        }
    }

    /// Load a schema by name, checking the cache before the search paths
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no `<name>.yaml`, `<name>.yml` or
    /// `<name>.json` exists in the search paths, or any parse/validation error
    /// of the file found.
    pub fn load(&mut self, name: &str) -> Result<MappingSchema> {
        if let Some(cached) = self.registry.get(name) {
            debug!("Cache hit for schema: {}", name);
            return Ok(cached.clone());
        }

        trace!("Cache miss for schema: {}", name);
        let path = self.find(name)?;
        let schema = Self::load_file(&path)?;
        self.registry.register(name, schema.clone());

        Ok(schema)
    }

    fn find(&self, name: &str) -> Result<PathBuf> {
        self.schema_paths
            .iter()
            .flat_map(|dir| {
                SCHEMA_EXTENSIONS
                    .iter()
                    .map(move |ext| dir.join(format!("{name}.{ext}")))
            })
            .find(|path| path.exists())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "{name} not found in search paths: {:?}",
                    self.schema_paths
                ))
            })
    }

    /// Load a schema from a specific file path
    ///
    /// Files ending in `.json` are read as JSON, everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an IO, parse or schema validation error.
    pub fn load_file(path: &Path) -> Result<MappingSchema> {
        trace!("Loading schema from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        let schema = if path.extension().is_some_and(|e| e == "json") {
            Self::parse_json(&content)?
        } else {
            Self::parse_yaml(&content)?
        };

        info!(name = %schema.name, loops = schema.loops.len(), "Loaded mapping schema");
        Ok(schema)
    }

    /// Parse a schema from a YAML string
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed YAML and a schema error for
    /// malformed declarations.
    pub fn parse_yaml(yaml: &str) -> Result<MappingSchema> {
        let file: SchemaFile = serde_yaml::from_str(yaml).map_err(|e| {
            let location = e
                .location()
                .map(|l| format!(" at line {}, column {}", l.line(), l.column()))
                .unwrap_or_default();
            Error::Parse(format!("YAML parse error: {e}{location}"))
        })?;

        convert_schema_file(file)
    }

    /// Parse a schema from a JSON string
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed JSON and a schema error for
    /// malformed declarations.
    pub fn parse_json(json: &str) -> Result<MappingSchema> {
        let file: SchemaFile = serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("JSON parse error: {e}")))?;

        convert_schema_file(file)
    }
}

fn convert_schema_file(file: SchemaFile) -> Result<MappingSchema> {
    let loops = file
        .loops
        .into_iter()
        .map(LoopFile::into_spec)
        .collect::<Result<Vec<_>>>()?;
    let root = parse_object(&file.schema, "")?;

    MappingSchema::new(file.name, loops, root)
}

fn parse_object(mapping: &Mapping, path: &str) -> Result<SchemaObject> {
    let mut object = SchemaObject::new();

    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            return Err(Error::invalid_node(
                path,
                format!("keys must be strings, found {}", describe(key)),
            ));
        };
        let path = child_path(path, key);
        object.insert(key, parse_node(value, &path)?);
    }

    Ok(object)
}

fn parse_node(value: &Value, path: &str) -> Result<SchemaNode> {
    let Value::Mapping(mapping) = value else {
        return Err(Error::invalid_node(
            path,
            format!("expected a mapping, found {}", describe(value)),
        ));
    };

    match (mapping.contains_key("segment"), mapping.contains_key("loop")) {
        (true, true) => Err(Error::invalid_node(
            path,
            "a node cannot have both 'segment' and 'loop'",
        )),
        (true, false) => parse_leaf(mapping, path).map(SchemaNode::Leaf),
        (false, true) => parse_branch(mapping, path).map(SchemaNode::Branch),
        (false, false) => parse_object(mapping, path).map(SchemaNode::Object),
    }
}

fn parse_leaf(mapping: &Mapping, path: &str) -> Result<FieldLeaf> {
    check_keys(mapping, &LEAF_KEYS, path)?;

    let segment = required_string(mapping, "segment", path)?;
    let value_index = required_index(mapping, "value", path)?;
    let leaf = FieldLeaf::new(segment, value_index);

    match (
        optional_index(mapping, "qualifier_index", path)?,
        optional_string(mapping, "qualifier_value", path)?,
    ) {
        (Some(index), Some(value)) => Ok(leaf.qualified(index, value)),
        (None, None) => Ok(leaf),
        _ => Err(Error::invalid_node(
            path,
            "'qualifier_index' and 'qualifier_value' must be given together",
        )),
    }
}

fn parse_branch(mapping: &Mapping, path: &str) -> Result<LoopBranch> {
    check_keys(mapping, &BRANCH_KEYS, path)?;

    let loop_ref = required_index(mapping, "loop", path)?;
    let fields = match mapping.get("fields") {
        Some(Value::Mapping(fields)) => parse_object(fields, path)?,
        Some(other) => {
            return Err(Error::invalid_node(
                path,
                format!("'fields' must be a mapping, found {}", describe(other)),
            ));
        }
        None => SchemaObject::new(),
    };

    Ok(LoopBranch::new(loop_ref, fields))
}

fn check_keys(mapping: &Mapping, allowed: &[&str], path: &str) -> Result<()> {
    for key in mapping.keys() {
        match key.as_str() {
            Some(k) if allowed.contains(&k) => {}
            _ => {
                return Err(Error::invalid_node(
                    path,
                    format!("unexpected key {}", describe(key)),
                ));
            }
        }
    }
    Ok(())
}

fn required_string(mapping: &Mapping, key: &str, path: &str) -> Result<String> {
    optional_string(mapping, key, path)?
        .ok_or_else(|| Error::invalid_node(path, format!("missing '{key}'")))
}

fn optional_string(mapping: &Mapping, key: &str, path: &str) -> Result<Option<String>> {
    match mapping.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::invalid_node(
            path,
            format!("'{key}' must be a string, found {}", describe(other)),
        )),
    }
}

fn required_index(mapping: &Mapping, key: &str, path: &str) -> Result<usize> {
    optional_index(mapping, key, path)?
        .ok_or_else(|| Error::invalid_node(path, format!("missing '{key}'")))
}

fn optional_index(mapping: &Mapping, key: &str, path: &str) -> Result<Option<usize>> {
    let Some(value) = mapping.get(key) else {
        return Ok(None);
    };

    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| {
            Error::invalid_node(
                path,
                format!("'{key}' must be a non-negative integer, found {}", describe(value)),
            )
        })
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("'{s}'"),
        Value::Sequence(_) => "a sequence".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(tagged) => format!("tagged value {}", tagged.tag),
    }
}
