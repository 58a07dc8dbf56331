//! Condition trees
//!
//! A condition is a binary node: `left OPERATOR right`. Logical operators
//! (AND, OR) hold sub-conditions as operands; comparisons hold field
//! references, literal values, or named parameters.

use std::fmt;

use serde_json::Value;

use crate::planner::QueryContext;

use super::chain::FieldRef;
use super::operator::Operator;

/// One side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(FieldRef),
    Value(Value),
    /// Named parameter bound at execution time
    Parameter(String),
    Condition(Box<Condition>),
}

impl Operand {
    /// Field operand for a dotted path
    pub fn field(path: &str) -> Self {
        Operand::Field(FieldRef::path(path))
    }

    pub fn value(value: Value) -> Self {
        Operand::Value(value)
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Operand::Parameter(name.into())
    }

    pub fn as_field(&self) -> Option<&FieldRef> {
        match self {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            Operand::Condition(condition) => Some(condition),
            _ => None,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Operand::Field(_))
    }

    /// The concrete value of a literal or bound parameter
    pub fn resolve(&self, ctx: &QueryContext) -> Option<Value> {
        match self {
            Operand::Value(value) => Some(value.clone()),
            Operand::Parameter(name) => ctx.parameter(name).cloned(),
            Operand::Field(_) | Operand::Condition(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(field) => write!(f, "{}", field),
            Operand::Value(value) => write!(f, "{}", value),
            Operand::Parameter(name) => write!(f, ":{}", name),
            Operand::Condition(condition) => write!(f, "({})", condition),
        }
    }
}

/// A binary condition node
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Operand,
    pub operator: Operator,
    pub right: Operand,
}

impl Condition {
    pub fn new(left: Operand, operator: Operator, right: Operand) -> Self {
        Self { left, operator, right }
    }

    /// `field <operator> value`
    pub fn compare(field: &str, operator: Operator, value: Value) -> Self {
        Self::new(Operand::field(field), operator, Operand::value(value))
    }

    /// `field = value`
    pub fn eq(field: &str, value: Value) -> Self {
        Self::compare(field, Operator::Equals, value)
    }

    /// `field BETWEEN from AND to`
    pub fn between(field: &str, from: Value, to: Value) -> Self {
        Self::compare(field, Operator::between(), Value::Array(vec![from, to]))
    }

    /// `field IN [values]`
    pub fn in_values(field: &str, values: Vec<Value>) -> Self {
        Self::compare(field, Operator::In, Value::Array(values))
    }

    /// `field <operator> :name`
    pub fn with_parameter(field: &str, operator: Operator, name: &str) -> Self {
        Self::new(Operand::field(field), operator, Operand::parameter(name))
    }

    pub fn and(left: Condition, right: Condition) -> Self {
        Self::new(
            Operand::Condition(Box::new(left)),
            Operator::And,
            Operand::Condition(Box::new(right)),
        )
    }

    pub fn or(left: Condition, right: Condition) -> Self {
        Self::new(
            Operand::Condition(Box::new(left)),
            Operator::Or,
            Operand::Condition(Box::new(right)),
        )
    }

    /// Rewrites `f > a AND f < b` style pairs on the same single-hop field
    /// into `f BETWEEN a AND b` with matching bound inclusivity, anywhere in
    /// the tree. Returns the number of rewrites performed.
    pub fn merge_ranges_into_between(&mut self) -> usize {
        if let Some(between) = self.as_between() {
            *self = between;
            return 1;
        }

        let mut merged = 0;
        if let Operand::Condition(left) = &mut self.left {
            merged += left.merge_ranges_into_between();
        }
        if let Operand::Condition(right) = &mut self.right {
            merged += right.merge_ranges_into_between();
        }
        merged
    }

    fn as_between(&self) -> Option<Condition> {
        if self.operator != Operator::And {
            return None;
        }
        let left = range_bound(self.left.as_condition()?)?;
        let right = range_bound(self.right.as_condition()?)?;
        if left.field != right.field {
            return None;
        }

        let (lower, upper) = match (left.lower, right.lower) {
            (true, false) => (left, right),
            (false, true) => (right, left),
            _ => return None,
        };

        Some(Condition::new(
            Operand::field(&lower.field),
            Operator::Between {
                from_inclusive: lower.inclusive,
                to_inclusive: upper.inclusive,
            },
            Operand::Value(Value::Array(vec![lower.value, upper.value])),
        ))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

/// One side of a range on a single-hop field
struct RangeBound {
    field: String,
    /// `>`/`>=` after normalizing the field to the left
    lower: bool,
    inclusive: bool,
    value: Value,
}

fn range_bound(condition: &Condition) -> Option<RangeBound> {
    if condition.left.is_field() && condition.right.is_field() {
        return None;
    }
    let (field, value, operator) = match (&condition.left, &condition.right) {
        (Operand::Field(field), Operand::Value(value)) => (field, value, condition.operator),
        (Operand::Value(value), Operand::Field(field)) => (field, value, condition.operator.inverted()),
        _ => return None,
    };
    let chain = field.field_chain()?;
    if chain.is_long() {
        return None;
    }

    let (lower, inclusive) = match operator {
        Operator::Major => (true, false),
        Operator::MajorEquals => (true, true),
        Operator::Minor => (false, false),
        Operator::MinorEquals => (false, true),
        _ => return None,
    };

    Some(RangeBound {
        field: chain.first().to_string(),
        lower,
        inclusive,
        value: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders_and_display() {
        let condition = Condition::and(
            Condition::eq("name", json!("ann")),
            Condition::between("age", json!(20), json!(30)),
        );
        assert_eq!(condition.to_string(), "(name = \"ann\") AND (age BETWEEN [20,30])");
        assert!(condition.left.as_condition().is_some());
    }

    #[test]
    fn test_resolve_parameter() {
        let ctx = QueryContext::new().with_parameter("min", json!(18));
        assert_eq!(Operand::parameter("min").resolve(&ctx), Some(json!(18)));
        assert_eq!(Operand::parameter("max").resolve(&ctx), None);
        assert_eq!(Operand::field("age").resolve(&ctx), None);
    }

    #[test]
    fn test_range_pair_becomes_between() {
        let mut condition = Condition::and(
            Condition::compare("age", Operator::Minor, json!(30)),
            Condition::compare("age", Operator::MajorEquals, json!(20)),
        );
        assert_eq!(condition.merge_ranges_into_between(), 1);
        assert_eq!(
            condition.operator,
            Operator::Between {
                from_inclusive: true,
                to_inclusive: false
            }
        );
        assert_eq!(condition.right, Operand::value(json!([20, 30])));
    }

    #[test]
    fn test_inverted_range_pair() {
        // 20 < age AND age <= 30
        let mut condition = Condition::and(
            Condition::new(Operand::value(json!(20)), Operator::Minor, Operand::field("age")),
            Condition::compare("age", Operator::MinorEquals, json!(30)),
        );
        assert_eq!(condition.merge_ranges_into_between(), 1);
        assert_eq!(
            condition.operator,
            Operator::Between {
                from_inclusive: false,
                to_inclusive: true
            }
        );
    }

    #[test]
    fn test_nested_rewrite_and_mismatch() {
        let range = Condition::and(
            Condition::compare("age", Operator::Major, json!(1)),
            Condition::compare("age", Operator::Minor, json!(9)),
        );
        let mut condition = Condition::or(range, Condition::eq("name", json!("x")));
        assert_eq!(condition.merge_ranges_into_between(), 1);

        let mut different_fields = Condition::and(
            Condition::compare("age", Operator::Major, json!(1)),
            Condition::compare("size", Operator::Minor, json!(9)),
        );
        assert_eq!(different_fields.merge_ranges_into_between(), 0);

        let mut same_direction = Condition::and(
            Condition::compare("age", Operator::Major, json!(1)),
            Condition::compare("age", Operator::MajorEquals, json!(9)),
        );
        assert_eq!(same_direction.merge_ranges_into_between(), 0);
    }
}
