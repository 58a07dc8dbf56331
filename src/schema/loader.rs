//! Schema loader
//!
//! Builds a [`MemoryCatalog`] from a JSON schema definition:
//!
//! ```json
//! {
//!   "database": "school",
//!   "classes": [
//!     { "name": "Group", "properties": [{ "name": "name", "type": "STRING" }] },
//!     { "name": "Student", "properties": [
//!         { "name": "group", "type": "LINK", "linked_class": "Group" } ] }
//!   ],
//!   "indexes": [
//!     { "name": "Student.group", "class": "Student", "fields": ["group"], "kind": "NOTUNIQUE" }
//!   ]
//! }
//! ```
//!
//! Index key types are derived from the declared property types. Every index
//! starts out empty.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::index::{IndexDefinition, IndexKind, MemoryIndex};

use super::catalog::{IndexCatalog, MemoryCatalog};
use super::errors::{SchemaError, SchemaResult};
use super::types::{PropertyDescriptor, SchemaClass};

fn default_database() -> String {
    "default".to_string()
}

/// Top-level schema document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub classes: Vec<ClassDefinition>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub class: String,
    pub fields: Vec<String>,
    pub kind: IndexKind,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub ignore_null_values: bool,
}

/// Loads schema definitions into catalogs
pub struct SchemaLoader;

impl SchemaLoader {
    /// Reads and builds a catalog from a JSON file
    pub fn load(path: &Path) -> SchemaResult<MemoryCatalog> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Builds a catalog from a JSON string
    pub fn from_json(text: &str) -> SchemaResult<MemoryCatalog> {
        let definition: SchemaDefinition = serde_json::from_str(text)?;
        Self::build(&definition)
    }

    /// Builds a catalog from a parsed definition.
    ///
    /// All classes are registered before any index so that indexes may
    /// reference inherited properties regardless of declaration order.
    pub fn build(definition: &SchemaDefinition) -> SchemaResult<MemoryCatalog> {
        let mut catalog = MemoryCatalog::new();

        for class_def in &definition.classes {
            let mut class = SchemaClass::new(&class_def.name);
            if let Some(superclass) = &class_def.superclass {
                class = class.with_superclass(superclass);
            }
            for property in &class_def.properties {
                if property.property_type.is_link() && property.linked_class.is_none() {
                    return Err(SchemaError::InvalidDefinition(format!(
                        "link property '{}.{}' has no linked class",
                        class_def.name, property.name
                    )));
                }
                class = class.with_property(property.clone());
            }
            catalog.add_class(class)?;
        }

        for spec in &definition.indexes {
            let index = Self::build_index(&catalog, spec, &definition.database)?;
            catalog.add_index(Arc::new(index))?;
        }

        Ok(catalog)
    }

    fn build_index(catalog: &MemoryCatalog, spec: &IndexSpec, database: &str) -> SchemaResult<MemoryIndex> {
        if spec.fields.is_empty() {
            return Err(SchemaError::InvalidDefinition(format!("index '{}' has no fields", spec.name)));
        }
        if catalog.class(&spec.class).is_none() {
            return Err(SchemaError::ClassNotFound(spec.class.clone()));
        }

        let mut typed_fields = Vec::with_capacity(spec.fields.len());
        for field in &spec.fields {
            let property = catalog
                .property(&spec.class, field)
                .ok_or_else(|| SchemaError::PropertyNotFound {
                    class: spec.class.clone(),
                    property: field.clone(),
                })?;
            let key_type = property.property_type.key_type().ok_or_else(|| {
                SchemaError::InvalidDefinition(format!("property '{}.{}' cannot be indexed", spec.class, field))
            })?;
            typed_fields.push((field.clone(), key_type));
        }

        let definition = IndexDefinition::composite(&spec.class, typed_fields)
            .with_null_values_ignored(spec.ignore_null_values);
        let mut index = MemoryIndex::new(&spec.name, spec.kind, definition).with_database(database);
        if let Some(algorithm) = &spec.algorithm {
            index = index.with_algorithm(algorithm);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::KeyType;
    use std::io::Write;

    const SCHOOL: &str = r#"{
        "database": "school",
        "classes": [
            { "name": "Curator", "properties": [
                { "name": "name", "type": "STRING" },
                { "name": "salary", "type": "INTEGER" } ] },
            { "name": "Group", "properties": [
                { "name": "curator", "type": "LINK", "linked_class": "Curator" } ] }
        ],
        "indexes": [
            { "name": "Curator.salary", "class": "Curator", "fields": ["salary"], "kind": "UNIQUE" },
            { "name": "Group.curator", "class": "Group", "fields": ["curator"], "kind": "NOTUNIQUE_HASH_INDEX" }
        ]
    }"#;

    #[test]
    fn test_load_from_json() {
        let catalog = SchemaLoader::from_json(SCHOOL).unwrap();
        let index = catalog.index("Group.curator").unwrap();
        assert_eq!(index.kind(), IndexKind::NotUniqueHash);
        assert_eq!(index.algorithm(), "HASH_INDEX");
        assert_eq!(index.database_name(), "school");
        assert_eq!(index.definition().key_types(), &[KeyType::Link]);
        assert_eq!(
            catalog.property("Group", "curator").and_then(|p| p.linked_class()),
            Some("Curator")
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCHOOL.as_bytes()).unwrap();

        let catalog = SchemaLoader::load(file.path()).unwrap();
        assert_eq!(catalog.classes().count(), 2);
    }

    #[test]
    fn test_link_without_class_rejected() {
        let text = r#"{ "classes": [ { "name": "A", "properties": [ { "name": "b", "type": "LINK" } ] } ] }"#;
        let err = SchemaLoader::from_json(text).unwrap_err();
        assert_eq!(err.code(), "CHAINPLAN_SCHEMA_INVALID_DEFINITION");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = r#"{
            "classes": [ { "name": "A", "properties": [] } ],
            "indexes": [ { "name": "A.x", "class": "A", "fields": ["x"], "kind": "UNIQUE" } ]
        }"#;
        let err = SchemaLoader::from_json(text).unwrap_err();
        assert_eq!(err.code(), "CHAINPLAN_SCHEMA_PROPERTY_NOT_FOUND");
    }

    #[test]
    fn test_malformed_json() {
        let err = SchemaLoader::from_json("{ not json").unwrap_err();
        assert_eq!(err.code(), "CHAINPLAN_SCHEMA_LOAD_FAILED");
    }
}
