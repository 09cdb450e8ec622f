//! Name-keyed cache of loaded mapping schemas

use crate::model::MappingSchema;
use std::collections::HashMap;

/// Registry for mapping schemas by name
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, MappingSchema>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Register a schema, replacing any schema of the same name
    pub fn register(&mut self, name: impl Into<String>, schema: MappingSchema) {
        self.schemas.insert(name.into(), schema);
    }

    /// Get a schema by name
    pub fn get(&self, name: &str) -> Option<&MappingSchema> {
        self.schemas.get(name)
    }

    /// Check if a schema exists
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no schema is cached
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
