//! Index catalog
//!
//! Answers which indexes exist on a class (including indexes inherited from
//! superclasses) and how classes link to each other through properties.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::index::Index;

use super::errors::{SchemaError, SchemaResult};
use super::types::{PropertyDescriptor, SchemaClass};

/// Read-only view of schema classes and their indexes
pub trait IndexCatalog {
    fn class(&self, name: &str) -> Option<&SchemaClass>;

    /// All indexes usable for a class, its own and its superclasses'
    fn indexes_on_class(&self, class: &str) -> Vec<Arc<dyn Index>>;

    /// Property lookup walking up the superclass chain
    fn property<'a>(&'a self, class: &str, name: &str) -> Option<&'a PropertyDescriptor> {
        let mut visited = HashSet::new();
        let mut current = self.class(class);
        while let Some(cls) = current {
            if !visited.insert(cls.name()) {
                return None;
            }
            if let Some(property) = cls.declared_property(name) {
                return Some(property);
            }
            current = cls.superclass().and_then(|s| self.class(s));
        }
        None
    }

    /// Indexes whose leading `fields.len()` fields are exactly `fields`,
    /// in any order
    fn involved_indexes(&self, class: &str, fields: &[String]) -> Vec<Arc<dyn Index>> {
        self.indexes_on_class(class)
            .into_iter()
            .filter(|index| index.definition().covers_fields(fields))
            .collect()
    }

    fn are_indexed(&self, class: &str, fields: &[String]) -> bool {
        !self.involved_indexes(class, fields).is_empty()
    }
}

/// In-memory catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    classes: BTreeMap<String, SchemaClass>,
    indexes: Vec<Arc<dyn Index>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: SchemaClass) -> SchemaResult<()> {
        if self.classes.contains_key(class.name()) {
            return Err(SchemaError::DuplicateClass(class.name().to_string()));
        }
        self.classes.insert(class.name().to_string(), class);
        Ok(())
    }

    /// Registers an index after checking its class and fields exist
    pub fn add_index(&mut self, index: Arc<dyn Index>) -> SchemaResult<()> {
        let definition = index.definition();
        let class = definition.class_name();
        if self.class(class).is_none() {
            return Err(SchemaError::ClassNotFound(class.to_string()));
        }
        for field in definition.fields() {
            if self.property(class, field).is_none() {
                return Err(SchemaError::PropertyNotFound {
                    class: class.to_string(),
                    property: field.clone(),
                });
            }
        }
        if self.index(index.name()).is_some() {
            return Err(SchemaError::DuplicateIndex(index.name().to_string()));
        }
        self.indexes.push(index);
        Ok(())
    }

    /// Looks up an index by name
    pub fn index(&self, name: &str) -> Option<Arc<dyn Index>> {
        self.indexes.iter().find(|i| i.name() == name).cloned()
    }

    pub fn classes(&self) -> impl Iterator<Item = &SchemaClass> {
        self.classes.values()
    }

    /// The class followed by its superclasses, nearest first
    fn hierarchy<'a>(&'a self, class: &str) -> Vec<&'a str> {
        let mut names: Vec<&str> = Vec::new();
        let mut current = self.classes.get(class);
        while let Some(cls) = current {
            if names.contains(&cls.name()) {
                break;
            }
            names.push(cls.name());
            current = cls.superclass().and_then(|s| self.classes.get(s));
        }
        names
    }
}

impl IndexCatalog for MemoryCatalog {
    fn class(&self, name: &str) -> Option<&SchemaClass> {
        self.classes.get(name)
    }

    fn indexes_on_class(&self, class: &str) -> Vec<Arc<dyn Index>> {
        let hierarchy = self.hierarchy(class);
        self.indexes
            .iter()
            .filter(|index| hierarchy.contains(&index.definition().class_name()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexDefinition, IndexKind, KeyType, MemoryIndex};
    use crate::schema::types::PropertyType;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|f| f.to_string()).collect()
    }

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        catalog
            .add_class(
                SchemaClass::new("Person")
                    .with_property(PropertyDescriptor::new("name", PropertyType::String))
                    .with_property(PropertyDescriptor::new("age", PropertyType::Integer)),
            )
            .unwrap();
        catalog
            .add_class(SchemaClass::new("Student").with_superclass("Person"))
            .unwrap();
        catalog
            .add_index(Arc::new(MemoryIndex::new(
                "Person.name",
                IndexKind::NotUnique,
                IndexDefinition::single("Person", "name", KeyType::String),
            )))
            .unwrap();
        catalog
            .add_index(Arc::new(MemoryIndex::new(
                "Person.name_age",
                IndexKind::Unique,
                IndexDefinition::composite("Person", [("name", KeyType::String), ("age", KeyType::Integer)]),
            )))
            .unwrap();
        catalog
    }

    #[test]
    fn test_inherited_property_and_indexes() {
        let catalog = catalog();
        assert!(catalog.property("Student", "name").is_some());
        assert!(catalog.property("Student", "missing").is_none());
        assert_eq!(catalog.indexes_on_class("Student").len(), 2);
    }

    #[test]
    fn test_involved_indexes_prefix() {
        let catalog = catalog();
        assert_eq!(catalog.involved_indexes("Person", &fields(&["name"])).len(), 2);
        assert_eq!(catalog.involved_indexes("Person", &fields(&["age", "name"])).len(), 1);
        assert!(!catalog.are_indexed("Person", &fields(&["age"])));
    }

    #[test]
    fn test_add_index_validates() {
        let mut catalog = catalog();
        let err = catalog
            .add_index(Arc::new(MemoryIndex::new(
                "Person.city",
                IndexKind::NotUnique,
                IndexDefinition::single("Person", "city", KeyType::String),
            )))
            .unwrap_err();
        assert_eq!(err.code(), "CHAINPLAN_SCHEMA_PROPERTY_NOT_FOUND");

        let err = catalog
            .add_index(Arc::new(MemoryIndex::new(
                "Person.name",
                IndexKind::NotUnique,
                IndexDefinition::single("Person", "name", KeyType::String),
            )))
            .unwrap_err();
        assert_eq!(err.code(), "CHAINPLAN_SCHEMA_DUPLICATE_INDEX");
    }

    #[test]
    fn test_superclass_cycle_terminates() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_class(SchemaClass::new("A").with_superclass("B")).unwrap();
        catalog.add_class(SchemaClass::new("B").with_superclass("A")).unwrap();
        assert!(catalog.property("A", "x").is_none());
        assert!(catalog.indexes_on_class("A").is_empty());
    }
}
