//! Index keys and key conversion
//!
//! Keys are totally ordered so key sets collapse duplicates and range scans
//! are deterministic. Ordering across variants:
//! Null < Bool < Int < Float < String < Link < Composite.
//!
//! Composite keys may be partial (fewer components than the index declares).
//! A partial key compares equal, by prefix, to every full key that starts
//! with it; see [`IndexKey::compare_prefix`].

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::definition::IndexDefinition;
use super::errors::KeyConversionError;

/// Record identity: cluster id plus position inside the cluster.
///
/// Rendered as `#<cluster>:<position>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub cluster: i32,
    pub position: i64,
}

impl Rid {
    pub const fn new(cluster: i32, position: i64) -> Self {
        Self { cluster, position }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

impl FromStr for Rid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix('#').unwrap_or(s);
        let (cluster, position) = body
            .split_once(':')
            .ok_or_else(|| format!("'{}' is not a record id", s))?;
        let cluster = cluster
            .parse()
            .map_err(|_| format!("invalid cluster in '{}'", s))?;
        let position = position
            .parse()
            .map_err(|_| format!("invalid position in '{}'", s))?;
        Ok(Rid::new(cluster, position))
    }
}

impl From<Rid> for Value {
    fn from(rid: Rid) -> Self {
        Value::String(rid.to_string())
    }
}

/// Declared type of one indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    Boolean,
    Integer,
    Float,
    String,
    Link,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Boolean => "BOOLEAN",
            KeyType::Integer => "INTEGER",
            KeyType::Float => "FLOAT",
            KeyType::String => "STRING",
            KeyType::Link => "LINK",
        }
    }

    /// Converts a filter operand into a key of this type.
    ///
    /// Null converts to [`IndexKey::Null`] for every type. Arrays and objects
    /// never convert; composite shaping happens in [`IndexDefinition`].
    pub fn convert(&self, value: &Value) -> Result<IndexKey, KeyConversionError> {
        let fail = |reason: &str| KeyConversionError::new(value, *self, reason);

        match (self, value) {
            (_, Value::Null) => Ok(IndexKey::Null),
            (_, Value::Array(_)) | (_, Value::Object(_)) => Err(fail("composite values cannot be keys")),

            (KeyType::Boolean, Value::Bool(b)) => Ok(IndexKey::Bool(*b)),
            (KeyType::Boolean, Value::String(s)) => s
                .parse()
                .map(IndexKey::Bool)
                .map_err(|_| fail("not a boolean")),
            (KeyType::Boolean, _) => Err(fail("not a boolean")),

            (KeyType::Integer, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Ok(IndexKey::Int(i))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(IndexKey::Int(f as i64))
                        }
                        _ => Err(fail("not an integer")),
                    }
                }
            }
            (KeyType::Integer, Value::String(s)) => s
                .trim()
                .parse()
                .map(IndexKey::Int)
                .map_err(|_| fail("not an integer")),
            (KeyType::Integer, _) => Err(fail("not an integer")),

            (KeyType::Float, Value::Number(n)) => n
                .as_f64()
                .map(IndexKey::from_float)
                .ok_or_else(|| fail("not a number")),
            (KeyType::Float, Value::String(s)) => s
                .trim()
                .parse()
                .map(IndexKey::from_float)
                .map_err(|_| fail("not a number")),
            (KeyType::Float, _) => Err(fail("not a number")),

            (KeyType::String, Value::String(s)) => Ok(IndexKey::String(s.clone())),
            (KeyType::String, Value::Number(n)) => Ok(IndexKey::String(n.to_string())),
            (KeyType::String, Value::Bool(b)) => Ok(IndexKey::String(b.to_string())),

            (KeyType::Link, Value::String(s)) => s
                .parse()
                .map(IndexKey::Link)
                .map_err(|reason: String| fail(&reason)),
            (KeyType::Link, _) => Err(fail("not a record id")),
        }
    }

    /// Converts a record id coming out of another index into a key of this type.
    pub fn convert_rid(&self, rid: Rid) -> Result<IndexKey, KeyConversionError> {
        match self {
            KeyType::Link => Ok(IndexKey::Link(rid)),
            KeyType::String => Ok(IndexKey::String(rid.to_string())),
            _ => Err(KeyConversionError::new(rid, *self, "record ids only convert to links")),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Index key value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexKey {
    Null,
    /// Boolean value (false < true)
    Bool(bool),
    Int(i64),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    String(String),
    Link(Rid),
    /// Composite key, possibly partial
    Composite(Vec<IndexKey>),
}

impl IndexKey {
    /// Create a key from a float
    ///
    /// Uses bit representation for total ordering.
    pub fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    /// Inverse of [`IndexKey::from_float`]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            IndexKey::Float(ordered) => {
                let bits = if (ordered >> 63) == 1 {
                    ordered ^ (1 << 63)
                } else {
                    !ordered
                };
                Some(f64::from_bits(bits))
            }
            _ => None,
        }
    }

    pub fn composite(parts: impl IntoIterator<Item = IndexKey>) -> Self {
        IndexKey::Composite(parts.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, IndexKey::Null)
    }

    /// Compares two keys considering only the components both have.
    ///
    /// For two composite keys, `[a]` and `[a, b]` compare `Equal`. Every other
    /// pair falls back to the total order.
    pub fn compare_prefix(&self, other: &IndexKey) -> Ordering {
        match (self, other) {
            (IndexKey::Composite(left), IndexKey::Composite(right)) => left
                .iter()
                .zip(right.iter())
                .map(|(l, r)| l.compare_prefix(r))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal),
            _ => self.cmp(other),
        }
    }
}

/// Converts record ids into the key set an index expects.
///
/// Each record id goes through the index's own key construction so composite
/// indexes receive correctly shaped partial keys. Duplicates collapse.
pub fn prepare_keys<'a, I>(
    definition: &IndexDefinition,
    rids: I,
) -> Result<BTreeSet<IndexKey>, KeyConversionError>
where
    I: IntoIterator<Item = &'a Rid>,
{
    rids.into_iter()
        .map(|rid| definition.create_value_from_rid(*rid))
        .collect()
}

/// Converts a filter operand into the key set an index expects.
///
/// A JSON array yields one key per distinct element; any other value yields
/// a single key.
pub fn prepare_value_keys(
    definition: &IndexDefinition,
    value: &Value,
) -> Result<BTreeSet<IndexKey>, KeyConversionError> {
    match value {
        Value::Array(values) => values
            .iter()
            .map(|v| definition.create_single_value(v))
            .collect(),
        other => Ok(BTreeSet::from([definition.create_single_value(other)?])),
    }
}
