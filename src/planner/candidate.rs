//! Search candidates
//!
//! A candidate describes one indexable part of a condition: some fields
//! bound by equality plus one last field compared by an arbitrary operator.
//! The equality fields followed by the first segment of the last field form
//! the key prefix an index must cover.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::filter::{FieldChain, Operator};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    /// Fields matched by equality, with their values
    pub field_value_pairs: BTreeMap<String, Value>,
    pub last_operator: Operator,
    pub last_field: FieldChain,
    pub last_value: Value,
    /// Some matched value is null
    pub contains_null_values: bool,
}

impl SearchCandidate {
    pub fn new(operator: Operator, field: FieldChain, value: Value) -> Self {
        let contains_null_values = value.is_null();
        Self {
            field_value_pairs: BTreeMap::new(),
            last_operator: operator,
            last_field: field,
            last_value: value,
            contains_null_values,
        }
    }

    /// Whether this and `other` can be combined into one composite candidate.
    ///
    /// Neither last field may be a multi-hop chain, both operators must allow
    /// merging, and at least one of them must be an equality.
    pub fn can_be_merged(&self, other: &SearchCandidate) -> bool {
        if self.last_field.is_long() || other.last_field.is_long() {
            return false;
        }
        if !self.last_operator.can_be_merged() || !other.last_operator.can_be_merged() {
            return false;
        }
        self.last_operator.is_equality() || other.last_operator.is_equality()
    }

    /// Combines two candidates.
    ///
    /// The non-equality side keeps its place as the last field; when both are
    /// equalities, `other` becomes the last field. Everything else moves into
    /// the equality map.
    pub fn merge(&self, other: &SearchCandidate) -> SearchCandidate {
        let (last, bound) = if other.last_operator.is_equality() && !self.last_operator.is_equality() {
            (self, other)
        } else {
            (other, self)
        };

        let mut merged = SearchCandidate::new(last.last_operator, last.last_field.clone(), last.last_value.clone());
        merged.field_value_pairs.extend(bound.field_value_pairs.clone());
        merged.field_value_pairs.extend(last.field_value_pairs.clone());
        merged
            .field_value_pairs
            .insert(bound.last_field.first().to_string(), bound.last_value.clone());
        merged.contains_null_values = self.contains_null_values || other.contains_null_values;
        merged
    }

    /// The key prefix fields: equality fields, then the last field's root
    pub fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.field_value_pairs.keys().cloned().collect();
        fields.push(self.last_field.first().to_string());
        fields
    }

    pub fn field_count(&self) -> usize {
        self.field_value_pairs.len() + 1
    }
}
