//! Schema class and property descriptors

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::KeyType;

/// Declared property type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    String,
    Link,
    LinkList,
    LinkSet,
    Embedded,
}

impl PropertyType {
    /// Whether the property points at records of another class
    pub fn is_link(&self) -> bool {
        matches!(self, PropertyType::Link | PropertyType::LinkList | PropertyType::LinkSet)
    }

    /// Key type an index over this property uses, if indexable
    pub fn key_type(&self) -> Option<KeyType> {
        match self {
            PropertyType::Boolean => Some(KeyType::Boolean),
            PropertyType::Integer | PropertyType::Long => Some(KeyType::Integer),
            PropertyType::Float | PropertyType::Double => Some(KeyType::Float),
            PropertyType::String => Some(KeyType::String),
            PropertyType::Link | PropertyType::LinkList | PropertyType::LinkSet => Some(KeyType::Link),
            PropertyType::Embedded => None,
        }
    }
}

/// A property of a schema class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Class the property links to (link properties only)
    #[serde(default)]
    pub linked_class: Option<String>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            linked_class: None,
        }
    }

    /// Creates a link property pointing at `class`
    pub fn link(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Link,
            linked_class: Some(class.into()),
        }
    }

    pub fn linked_class(&self) -> Option<&str> {
        self.linked_class.as_deref()
    }
}

/// A schema class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaClass {
    name: String,
    superclass: Option<String>,
    properties: BTreeMap<String, PropertyDescriptor>,
}

impl SchemaClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.insert(property.name.clone(), property);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Property declared directly on this class
    pub fn declared_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_property() {
        let prop = PropertyDescriptor::link("group", "Group");
        assert!(prop.property_type.is_link());
        assert_eq!(prop.linked_class(), Some("Group"));
        assert_eq!(prop.property_type.key_type(), Some(KeyType::Link));
    }

    #[test]
    fn test_embedded_not_indexable() {
        assert_eq!(PropertyType::Embedded.key_type(), None);
        assert_eq!(PropertyType::Double.key_type(), Some(KeyType::Float));
    }

    #[test]
    fn test_class_builder() {
        let class = SchemaClass::new("Student")
            .with_superclass("Person")
            .with_property(PropertyDescriptor::new("name", PropertyType::String));
        assert_eq!(class.superclass(), Some("Person"));
        assert!(class.declared_property("name").is_some());
        assert!(class.declared_property("age").is_none());
    }
}
