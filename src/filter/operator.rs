//! Condition operators
//!
//! Operators are a closed set. Each one is described by a row of a flat
//! descriptor table (symbol, index reuse type, equality, mergeability) and
//! knows how to run itself against an index once the planner has chosen one.

use std::fmt;
use std::iter;

use serde_json::Value;

use crate::index::{prepare_value_keys, EntryStream, Index, IndexEntry, IndexKey, IndexKind, IndexResult};
use crate::planner::{QueryContext, SearchCandidate};

use super::condition::Operand;

/// How a condition using an operator can take advantage of indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexReuseType {
    /// Logical AND: candidates from both sides may merge into a wider one
    IndexIntersection,
    /// Logical OR: every side needs its own index
    IndexUnion,
    /// Direct comparison of a field against a value
    IndexMethod,
    /// The operator builds its own candidate
    IndexOperator,
    NoIndex,
}

/// Static properties of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDescriptor {
    pub symbol: &'static str,
    pub reuse_type: IndexReuseType,
    /// Probes an index with an exact key
    pub equality: bool,
    /// May take part in composite candidate merges
    pub can_be_merged: bool,
}

const fn descriptor(
    symbol: &'static str,
    reuse_type: IndexReuseType,
    equality: bool,
    can_be_merged: bool,
) -> OperatorDescriptor {
    OperatorDescriptor {
        symbol,
        reuse_type,
        equality,
        can_be_merged,
    }
}

/// Comparison and logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
    Equals,
    NotEquals,
    /// `>`
    Major,
    /// `>=`
    MajorEquals,
    /// `<`
    Minor,
    /// `<=`
    MinorEquals,
    /// Right operand is a two element array `[from, to]`
    Between {
        from_inclusive: bool,
        to_inclusive: bool,
    },
    /// Right operand is an array of candidate values
    In,
    Contains,
    ContainsKey,
    ContainsValue,
    ContainsText,
    Like,
}

impl Operator {
    /// Every operator, in symbol lookup order
    pub const ALL: [Operator; 16] = [
        Operator::And,
        Operator::Or,
        Operator::Not,
        Operator::Equals,
        Operator::NotEquals,
        Operator::Major,
        Operator::MajorEquals,
        Operator::Minor,
        Operator::MinorEquals,
        Operator::Between {
            from_inclusive: true,
            to_inclusive: true,
        },
        Operator::In,
        Operator::Contains,
        Operator::ContainsKey,
        Operator::ContainsValue,
        Operator::ContainsText,
        Operator::Like,
    ];

    /// Inclusive `BETWEEN`
    pub const fn between() -> Self {
        Operator::Between {
            from_inclusive: true,
            to_inclusive: true,
        }
    }

    pub fn descriptor(&self) -> OperatorDescriptor {
        use IndexReuseType::*;
        match self {
            Operator::And => descriptor("AND", IndexIntersection, false, true),
            Operator::Or => descriptor("OR", IndexUnion, false, true),
            Operator::Not => descriptor("NOT", NoIndex, false, true),
            Operator::Equals => descriptor("=", IndexMethod, true, true),
            Operator::NotEquals => descriptor("<>", NoIndex, false, true),
            Operator::Major => descriptor(">", IndexMethod, false, true),
            Operator::MajorEquals => descriptor(">=", IndexMethod, false, true),
            Operator::Minor => descriptor("<", IndexMethod, false, true),
            Operator::MinorEquals => descriptor("<=", IndexMethod, false, true),
            Operator::Between { .. } => descriptor("BETWEEN", IndexMethod, false, true),
            Operator::In => descriptor("IN", IndexMethod, false, true),
            Operator::Contains => descriptor("CONTAINS", IndexMethod, true, true),
            Operator::ContainsKey => descriptor("CONTAINSKEY", IndexMethod, true, true),
            Operator::ContainsValue => descriptor("CONTAINSVALUE", IndexMethod, true, true),
            Operator::ContainsText => descriptor("CONTAINSTEXT", IndexOperator, false, false),
            Operator::Like => descriptor("LIKE", NoIndex, false, true),
        }
    }

    /// Looks an operator up by symbol, case-insensitively
    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        let symbol = symbol.trim();
        if symbol == "!=" {
            return Some(Operator::NotEquals);
        }
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.descriptor().symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn symbol(&self) -> &'static str {
        self.descriptor().symbol
    }

    /// Index reuse type for a condition with these operands.
    ///
    /// Logical operators only take part in index analysis when both sides
    /// are sub-conditions.
    pub fn index_reuse_type(&self, left: &Operand, right: &Operand) -> IndexReuseType {
        let reuse_type = self.descriptor().reuse_type;
        match reuse_type {
            IndexReuseType::IndexIntersection | IndexReuseType::IndexUnion => {
                if left.as_condition().is_some() && right.as_condition().is_some() {
                    reuse_type
                } else {
                    IndexReuseType::NoIndex
                }
            }
            _ => reuse_type,
        }
    }

    pub fn is_equality(&self) -> bool {
        self.descriptor().equality
    }

    pub fn can_be_merged(&self) -> bool {
        self.descriptor().can_be_merged
    }

    /// The operator to use when the compared field sits on the right
    /// (`5 < age` is `age > 5`).
    pub fn inverted(&self) -> Operator {
        match self {
            Operator::Major => Operator::Minor,
            Operator::Minor => Operator::Major,
            Operator::MajorEquals => Operator::MinorEquals,
            Operator::MinorEquals => Operator::MajorEquals,
            Operator::In => Operator::Contains,
            Operator::Contains => Operator::In,
            other => *other,
        }
    }

    /// Candidate construction hook for operators with
    /// [`IndexReuseType::IndexOperator`].
    ///
    /// `CONTAINSTEXT` yields a candidate when a plain field chain on the left
    /// is matched against a string.
    pub fn try_build_candidate(&self, left: &Operand, right: &Operand, ctx: &QueryContext) -> Option<SearchCandidate> {
        match self {
            Operator::ContainsText => {
                let chain = left.as_field()?.field_chain()?;
                let value = right.resolve(ctx)?;
                if !value.is_string() {
                    return None;
                }
                Some(SearchCandidate::new(*self, chain, value))
            }
            _ => None,
        }
    }

    /// Whether [`Operator::execute_index_query`] can serve this index with
    /// `param_count` key parameters.
    pub fn supports_index(&self, index: &dyn Index, param_count: usize) -> bool {
        let definition = index.definition();
        if param_count == 0 || param_count > definition.param_count() {
            return false;
        }
        let composite = definition.is_composite();
        let full_key = param_count == definition.param_count();
        let ranges = index.has_range_query_support();

        match self {
            Operator::Equals | Operator::Contains | Operator::ContainsKey | Operator::ContainsValue => {
                index.can_be_used_in_equality_operators() && (!composite || ranges || full_key)
            }
            Operator::In => !composite || ranges || full_key,
            Operator::Major
            | Operator::MajorEquals
            | Operator::Minor
            | Operator::MinorEquals
            | Operator::Between { .. } => ranges,
            Operator::ContainsText => index.kind() == IndexKind::FullText && !composite,
            Operator::And | Operator::Or | Operator::Not | Operator::NotEquals | Operator::Like => false,
        }
    }

    /// Runs this operator against an index.
    ///
    /// `key_params` holds one value per leading index field; the last one is
    /// the value compared by this operator (the `[from, to]` pair for
    /// `BETWEEN`, the value list for `IN`). Returns `Ok(None)` when the index
    /// cannot serve the operator.
    pub fn execute_index_query<'a>(
        &self,
        index: &'a dyn Index,
        key_params: &[Value],
        ascending: bool,
    ) -> IndexResult<Option<EntryStream<'a>>> {
        if !self.supports_index(index, key_params.len()) {
            return Ok(None);
        }
        let definition = index.definition();
        let composite = definition.is_composite();
        let (last, prefix) = match key_params.split_last() {
            Some(split) => split,
            None => return Ok(None),
        };

        let stream: EntryStream<'a> = match self {
            Operator::Equals
            | Operator::Contains
            | Operator::ContainsKey
            | Operator::ContainsValue
            | Operator::ContainsText => {
                let key = definition.create_value(key_params)?;
                exact_match(index, key, ascending)?
            }

            Operator::Major | Operator::MajorEquals => {
                let inclusive = matches!(self, Operator::MajorEquals);
                let key = definition.create_value(key_params)?;
                if composite && !prefix.is_empty() {
                    let upper = definition.create_value(prefix)?;
                    index.entries_between(&key, inclusive, &upper, true, ascending)?
                } else {
                    index.entries_major(&key, inclusive, ascending)?
                }
            }

            Operator::Minor | Operator::MinorEquals => {
                let inclusive = matches!(self, Operator::MinorEquals);
                let key = definition.create_value(key_params)?;
                if composite && !prefix.is_empty() {
                    let lower = definition.create_value(prefix)?;
                    index.entries_between(&lower, true, &key, inclusive, ascending)?
                } else {
                    index.entries_minor(&key, inclusive, ascending)?
                }
            }

            Operator::Between {
                from_inclusive,
                to_inclusive,
            } => {
                let (from, to) = match last.as_array().map(Vec::as_slice) {
                    Some([from, to]) => (from, to),
                    _ => return Ok(None),
                };
                let from_key = definition.create_value(&with_last(prefix, from))?;
                let to_key = definition.create_value(&with_last(prefix, to))?;
                index.entries_between(&from_key, *from_inclusive, &to_key, *to_inclusive, ascending)?
            }

            Operator::In => {
                let values = match last {
                    Value::Array(values) => values.clone(),
                    single => vec![single.clone()],
                };
                if composite {
                    let keys = values
                        .iter()
                        .map(|value| definition.create_value(&with_last(prefix, value)))
                        .collect::<Result<Vec<_>, _>>()?;
                    let streams = keys
                        .into_iter()
                        .map(move |key| exact_match(index, key, ascending))
                        .flat_map(|stream| match stream {
                            Ok(stream) => stream,
                            Err(err) => Box::new(iter::once(Err(err))),
                        });
                    Box::new(streams)
                } else {
                    let keys = prepare_value_keys(definition, &Value::Array(values))?;
                    index.entries(&keys, ascending)?
                }
            }

            Operator::And | Operator::Or | Operator::Not | Operator::NotEquals | Operator::Like => {
                return Ok(None)
            }
        };

        Ok(Some(stream))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Entries stored under `key`.
///
/// Partial composite keys become a closed prefix range when the index
/// supports ranges.
fn exact_match(index: &dyn Index, key: IndexKey, ascending: bool) -> IndexResult<EntryStream<'_>> {
    let definition = index.definition();
    let partial = match &key {
        IndexKey::Composite(parts) => parts.len() < definition.param_count(),
        _ => false,
    };

    if definition.is_composite() && (partial || index.has_range_query_support()) {
        return index.entries_between(&key, true, &key, true, ascending);
    }

    let mut rids = index.get(&key)?;
    if !ascending {
        rids.reverse();
    }
    Ok(Box::new(
        rids.into_iter()
            .map(move |rid| Ok(IndexEntry::new(Some(key.clone()), rid))),
    ))
}

fn with_last(prefix: &[Value], last: &Value) -> Vec<Value> {
    let mut params = prefix.to_vec();
    params.push(last.clone());
    params
}
