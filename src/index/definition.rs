//! Index definitions and kinds
//!
//! A definition pairs each indexed field with its declared key type, so the
//! field count always equals the key type count.

use std::slice;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::KeyConversionError;
use super::key::{IndexKey, KeyType, Rid};

/// Index implementation kind.
///
/// Chained proxy variants are de-duplicated per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKind {
    #[serde(rename = "UNIQUE")]
    Unique,
    #[serde(rename = "NOTUNIQUE")]
    NotUnique,
    #[serde(rename = "UNIQUE_HASH_INDEX")]
    UniqueHash,
    #[serde(rename = "NOTUNIQUE_HASH_INDEX")]
    NotUniqueHash,
    #[serde(rename = "FULLTEXT")]
    FullText,
    #[serde(rename = "DICTIONARY")]
    Dictionary,
    #[serde(rename = "SPATIAL")]
    Spatial,
    #[serde(rename = "PROXY")]
    Proxy,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Unique => "UNIQUE",
            IndexKind::NotUnique => "NOTUNIQUE",
            IndexKind::UniqueHash => "UNIQUE_HASH_INDEX",
            IndexKind::NotUniqueHash => "NOTUNIQUE_HASH_INDEX",
            IndexKind::FullText => "FULLTEXT",
            IndexKind::Dictionary => "DICTIONARY",
            IndexKind::Spatial => "SPATIAL",
            IndexKind::Proxy => "PROXY",
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(
            self,
            IndexKind::Unique | IndexKind::UniqueHash | IndexKind::Dictionary
        )
    }

    pub fn is_hash(&self) -> bool {
        matches!(self, IndexKind::UniqueHash | IndexKind::NotUniqueHash)
    }

    /// Whether ordered range iteration is available
    pub fn supports_range(&self) -> bool {
        matches!(
            self,
            IndexKind::Unique | IndexKind::NotUnique | IndexKind::Dictionary
        )
    }

    /// Default storage algorithm name for this kind
    pub fn default_algorithm(&self) -> &'static str {
        if self.is_hash() {
            "HASH_INDEX"
        } else {
            "SBTREE"
        }
    }
}

/// Shape of one concrete secondary index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    class_name: String,
    fields: Vec<String>,
    key_types: Vec<KeyType>,
    #[serde(default)]
    null_values_ignored: bool,
}

impl IndexDefinition {
    /// Creates a definition over a single field
    pub fn single(class_name: impl Into<String>, field: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            class_name: class_name.into(),
            fields: vec![field.into()],
            key_types: vec![key_type],
            null_values_ignored: false,
        }
    }

    /// Creates a definition over an ordered list of fields
    pub fn composite<F>(class_name: impl Into<String>, fields: impl IntoIterator<Item = (F, KeyType)>) -> Self
    where
        F: Into<String>,
    {
        let (fields, key_types) = fields
            .into_iter()
            .map(|(field, key_type)| (field.into(), key_type))
            .unzip();
        Self {
            class_name: class_name.into(),
            fields,
            key_types,
            null_values_ignored: false,
        }
    }

    /// Sets whether null keys are left out of the index
    pub fn with_null_values_ignored(mut self, ignored: bool) -> Self {
        self.null_values_ignored = ignored;
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn key_types(&self) -> &[KeyType] {
        &self.key_types
    }

    pub fn param_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_composite(&self) -> bool {
        self.param_count() > 1
    }

    pub fn is_null_values_ignored(&self) -> bool {
        self.null_values_ignored
    }

    /// Builds a key from positional parameters.
    ///
    /// Simple indexes take exactly one parameter. Composite indexes take
    /// between one and `param_count` parameters and produce a (possibly
    /// partial) composite key.
    pub fn create_value(&self, params: &[Value]) -> Result<IndexKey, KeyConversionError> {
        let first_type = self.key_types.first().copied().unwrap_or(KeyType::String);

        if params.is_empty() {
            return Err(KeyConversionError::new("[]", first_type, "no key parameters"));
        }

        if !self.is_composite() {
            if params.len() > 1 {
                return Err(KeyConversionError::new(
                    Value::Array(params.to_vec()),
                    first_type,
                    "too many parameters for a single-field index",
                ));
            }
            return first_type.convert(&params[0]);
        }

        if params.len() > self.param_count() {
            return Err(KeyConversionError::new(
                Value::Array(params.to_vec()),
                first_type,
                format!("index '{}' takes at most {} parameters", self.fields.join(","), self.param_count()),
            ));
        }

        self.key_types
            .iter()
            .zip(params)
            .map(|(key_type, value)| key_type.convert(value))
            .collect::<Result<Vec<_>, _>>()
            .map(IndexKey::Composite)
    }

    /// Builds a key from one value (a one-component partial key for composites)
    pub fn create_single_value(&self, value: &Value) -> Result<IndexKey, KeyConversionError> {
        self.create_value(slice::from_ref(value))
    }

    /// Builds a key for a record id linked from the first indexed field
    pub fn create_value_from_rid(&self, rid: Rid) -> Result<IndexKey, KeyConversionError> {
        let first_type = self.key_types.first().copied().unwrap_or(KeyType::Link);
        let key = first_type.convert_rid(rid)?;
        if self.is_composite() {
            Ok(IndexKey::Composite(vec![key]))
        } else {
            Ok(key)
        }
    }

    /// Returns true if the first `fields.len()` declared fields are exactly
    /// the given field set, in any order.
    pub fn covers_fields(&self, fields: &[String]) -> bool {
        if fields.is_empty() || fields.len() > self.param_count() {
            return false;
        }
        let prefix = &self.fields[..fields.len()];
        fields.iter().all(|f| prefix.contains(f)) && prefix.iter().all(|f| fields.contains(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_field_and_key_type_counts_match() {
        let def = IndexDefinition::composite(
            "Person",
            [("name", KeyType::String), ("age", KeyType::Integer)],
        );
        assert_eq!(def.param_count(), 2);
        assert_eq!(def.key_types().len(), def.fields().len());
        assert!(def.is_composite());
    }

    #[test]
    fn test_create_value_simple() {
        let def = IndexDefinition::single("Person", "age", KeyType::Integer);
        assert_eq!(def.create_value(&[json!(30)]).unwrap(), IndexKey::Int(30));
        assert!(def.create_value(&[json!(1), json!(2)]).is_err());
        assert!(def.create_value(&[]).is_err());
    }

    #[test]
    fn test_create_value_partial_composite() {
        let def = IndexDefinition::composite(
            "Person",
            [("name", KeyType::String), ("age", KeyType::Integer)],
        );
        let partial = def.create_value(&[json!("bob")]).unwrap();
        assert_eq!(partial, IndexKey::composite([IndexKey::String("bob".into())]));

        let full = def.create_value(&[json!("bob"), json!("7")]).unwrap();
        assert_eq!(
            full,
            IndexKey::composite([IndexKey::String("bob".into()), IndexKey::Int(7)])
        );

        assert!(def.create_value(&[json!("a"), json!(1), json!(2)]).is_err());
    }

    #[test]
    fn test_covers_fields_prefix_set() {
        let def = IndexDefinition::composite(
            "Person",
            [("name", KeyType::String), ("age", KeyType::Integer)],
        );
        assert!(def.covers_fields(&names(&["name"])));
        assert!(def.covers_fields(&names(&["age", "name"])));
        assert!(!def.covers_fields(&names(&["age"])));
        assert!(!def.covers_fields(&names(&["name", "name"])));
        assert!(!def.covers_fields(&names(&["name", "age", "city"])));
    }

    #[test]
    fn test_kind_capabilities() {
        assert!(IndexKind::NotUnique.supports_range());
        assert!(!IndexKind::UniqueHash.supports_range());
        assert!(IndexKind::UniqueHash.is_unique());
        assert_eq!(IndexKind::NotUniqueHash.default_algorithm(), "HASH_INDEX");
    }
}
