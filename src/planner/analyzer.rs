//! Search-candidate analysis
//!
//! Walks a condition tree and collects the parts that some index could
//! answer. The main condition is first split at OR nodes; each branch then
//! yields its own candidate list, most specific candidate first.

use serde_json::Value;

use crate::filter::{Condition, FieldRef, IndexReuseType, Operand};
use crate::observability::{log_event, Event};
use crate::schema::IndexCatalog;

use super::candidate::SearchCandidate;
use super::context::QueryContext;

/// Finds indexable sub-expressions of a condition
#[derive(Clone, Copy)]
pub struct FilterAnalyzer<'a> {
    catalog: &'a dyn IndexCatalog,
}

impl<'a> FilterAnalyzer<'a> {
    pub fn new(catalog: &'a dyn IndexCatalog) -> Self {
        Self { catalog }
    }

    /// Candidate lists, one per OR branch of the condition.
    ///
    /// A missing condition yields no branches.
    pub fn analyze_main_condition(
        &self,
        condition: Option<&Condition>,
        class: &str,
        ctx: &QueryContext,
    ) -> Vec<Vec<SearchCandidate>> {
        let Some(condition) = condition else {
            return Vec::new();
        };

        let mut hierarchy = Vec::new();
        self.analyze_union(condition, class, ctx, &mut hierarchy);

        let candidates: usize = hierarchy.iter().map(Vec::len).sum();
        log_event(
            Event::CandidatesAnalyzed,
            &[
                ("class", class),
                ("branches", &hierarchy.len().to_string()),
                ("candidates", &candidates.to_string()),
            ],
        );
        hierarchy
    }

    fn analyze_union(
        &self,
        condition: &Condition,
        class: &str,
        ctx: &QueryContext,
        hierarchy: &mut Vec<Vec<SearchCandidate>>,
    ) {
        if condition.operator.index_reuse_type(&condition.left, &condition.right) == IndexReuseType::IndexUnion {
            if let (Some(left), Some(right)) = (condition.left.as_condition(), condition.right.as_condition()) {
                self.analyze_union(left, class, ctx, hierarchy);
                self.analyze_union(right, class, ctx, hierarchy);
                return;
            }
        }
        hierarchy.push(self.analyze_condition(condition, class, ctx));
    }

    /// Candidates of one OR-free branch, sorted by field count, widest first.
    ///
    /// When no candidate is backed by an index the raw top-level result is
    /// still returned so the selector can try a chain for it.
    pub fn analyze_condition(&self, condition: &Condition, class: &str, ctx: &QueryContext) -> Vec<SearchCandidate> {
        let mut candidates = Vec::new();
        let last = self.analyze_filter_branch(condition, class, ctx, &mut candidates);
        if candidates.is_empty() {
            if let Some(last) = last {
                candidates.push(last);
            }
        }
        candidates.sort_by(|a, b| b.field_count().cmp(&a.field_count()));
        candidates
    }

    fn analyze_filter_branch(
        &self,
        condition: &Condition,
        class: &str,
        ctx: &QueryContext,
        candidates: &mut Vec<SearchCandidate>,
    ) -> Option<SearchCandidate> {
        match condition.operator.index_reuse_type(&condition.left, &condition.right) {
            IndexReuseType::IndexIntersection => {
                let left = self.analyze_filter_branch(condition.left.as_condition()?, class, ctx, candidates);
                let right = self.analyze_filter_branch(condition.right.as_condition()?, class, ctx, candidates);
                let (left, right) = (left?, right?);
                if !left.can_be_merged(&right) {
                    return None;
                }
                let merged = left.merge(&right);
                if self.catalog.are_indexed(class, &merged.fields()) {
                    candidates.push(merged.clone());
                }
                Some(merged)
            }
            IndexReuseType::IndexMethod => {
                let candidate = self
                    .create_indexed_property(condition, &condition.left, ctx)
                    .or_else(|| self.create_indexed_property(condition, &condition.right, ctx))?;
                if self.check_index_existence(class, &candidate) {
                    candidates.push(candidate.clone());
                }
                Some(candidate)
            }
            IndexReuseType::IndexOperator => {
                let candidate = condition
                    .operator
                    .try_build_candidate(&condition.left, &condition.right, ctx)?;
                if self.check_index_existence(class, &candidate) {
                    candidates.push(candidate.clone());
                }
                Some(candidate)
            }
            IndexReuseType::IndexUnion | IndexReuseType::NoIndex => None,
        }
    }

    /// Candidate for `field <op> value` where `item` is the field side
    fn create_indexed_property(
        &self,
        condition: &Condition,
        item: &Operand,
        ctx: &QueryContext,
    ) -> Option<SearchCandidate> {
        let field: &FieldRef = item.as_field()?;
        if condition.left.is_field() && condition.right.is_field() {
            return None;
        }
        let chain = field.field_chain()?;

        let inverted = std::ptr::eq(item, &condition.right);
        let (operator, other) = if inverted {
            (condition.operator.inverted(), &condition.left)
        } else {
            (condition.operator, &condition.right)
        };
        let value: Value = other.resolve(ctx)?;

        Some(SearchCandidate::new(operator, chain, value))
    }

    /// Whether the candidate's fields are indexed, following every hop of a
    /// multi-hop last field through the linked classes
    fn check_index_existence(&self, class: &str, candidate: &SearchCandidate) -> bool {
        if !self.catalog.are_indexed(class, &candidate.fields()) {
            return false;
        }

        let chain = &candidate.last_field;
        if !chain.is_long() {
            return true;
        }

        let mut linked = self.linked_class(class, chain.item_name(0));
        for hop in 1..chain.item_count() {
            let Some(owner) = linked else {
                return false;
            };
            let item = chain.item_name(hop);
            if !self.catalog.are_indexed(&owner, &[item.to_string()]) {
                return false;
            }
            linked = self.linked_class(&owner, item);
        }
        true
    }

    fn linked_class(&self, class: &str, property: &str) -> Option<String> {
        self.catalog
            .property(class, property)
            .and_then(|p| p.linked_class())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FieldItem, Operator};
    use crate::index::{IndexDefinition, IndexKind, KeyType, MemoryIndex};
    use crate::schema::{MemoryCatalog, PropertyDescriptor, PropertyType, SchemaClass};
    use serde_json::json;
    use std::sync::Arc;

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        catalog
            .add_class(SchemaClass::new("Group").with_property(PropertyDescriptor::new("name", PropertyType::String)))
            .unwrap();
        catalog
            .add_class(
                SchemaClass::new("Student")
                    .with_property(PropertyDescriptor::new("name", PropertyType::String))
                    .with_property(PropertyDescriptor::new("age", PropertyType::Integer))
                    .with_property(PropertyDescriptor::new("city", PropertyType::String))
                    .with_property(PropertyDescriptor::link("group", "Group")),
            )
            .unwrap();

        let indexes = [
            MemoryIndex::new(
                "Student.name",
                IndexKind::NotUnique,
                IndexDefinition::single("Student", "name", KeyType::String),
            ),
            MemoryIndex::new(
                "Student.name_age",
                IndexKind::NotUnique,
                IndexDefinition::composite("Student", [("name", KeyType::String), ("age", KeyType::Integer)]),
            ),
            MemoryIndex::new(
                "Student.group",
                IndexKind::NotUnique,
                IndexDefinition::single("Student", "group", KeyType::Link),
            ),
            MemoryIndex::new(
                "Group.name",
                IndexKind::Unique,
                IndexDefinition::single("Group", "name", KeyType::String),
            ),
        ];
        for index in indexes {
            catalog.add_index(Arc::new(index)).unwrap();
        }
        catalog
    }

    fn analyze(catalog: &MemoryCatalog, condition: &Condition) -> Vec<Vec<SearchCandidate>> {
        FilterAnalyzer::new(catalog).analyze_main_condition(Some(condition), "Student", &QueryContext::new())
    }

    #[test]
    fn test_no_condition() {
        let catalog = catalog();
        let analyzer = FilterAnalyzer::new(&catalog);
        assert!(analyzer
            .analyze_main_condition(None, "Student", &QueryContext::new())
            .is_empty());
    }

    #[test]
    fn test_simple_equality() {
        let catalog = catalog();
        let hierarchy = analyze(&catalog, &Condition::eq("name", json!("ann")));

        assert_eq!(hierarchy.len(), 1);
        assert_eq!(hierarchy[0].len(), 1);
        let candidate = &hierarchy[0][0];
        assert_eq!(candidate.last_operator, Operator::Equals);
        assert_eq!(candidate.last_field.first(), "name");
        assert_eq!(candidate.last_value, json!("ann"));
    }

    #[test]
    fn test_and_merges_into_composite_first() {
        let catalog = catalog();
        let condition = Condition::and(
            Condition::eq("name", json!("ann")),
            Condition::compare("age", Operator::Major, json!(20)),
        );
        let hierarchy = analyze(&catalog, &condition);

        let candidates = &hierarchy[0];
        // name (indexed), age (not indexed alone), name+age (composite)
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].field_count(), 2);
        assert_eq!(candidates[0].last_operator, Operator::Major);
        assert_eq!(candidates[0].field_value_pairs.get("name"), Some(&json!("ann")));
        assert_eq!(candidates[1].field_count(), 1);
    }

    #[test]
    fn test_unindexed_field_still_reported() {
        let catalog = catalog();
        let hierarchy = analyze(&catalog, &Condition::eq("city", json!("Rome")));
        assert_eq!(hierarchy[0].len(), 1);
        assert_eq!(hierarchy[0][0].last_field.first(), "city");
    }

    #[test]
    fn test_or_splits_branches() {
        let catalog = catalog();
        let condition = Condition::or(
            Condition::eq("name", json!("ann")),
            Condition::or(Condition::eq("age", json!(3)), Condition::eq("city", json!("Rome"))),
        );
        let hierarchy = analyze(&catalog, &condition);
        assert_eq!(hierarchy.len(), 3);
    }

    #[test]
    fn test_inverted_comparison() {
        let catalog = catalog();
        let condition = Condition::new(Operand::value(json!(18)), Operator::Minor, Operand::field("age"));
        let hierarchy = analyze(&catalog, &condition);

        let candidate = &hierarchy[0][0];
        assert_eq!(candidate.last_operator, Operator::Major);
        assert_eq!(candidate.last_field.first(), "age");
        assert_eq!(candidate.last_value, json!(18));
    }

    #[test]
    fn test_field_to_field_not_indexable() {
        let catalog = catalog();
        let condition = Condition::new(Operand::field("name"), Operator::Equals, Operand::field("city"));
        assert!(analyze(&catalog, &condition)[0].is_empty());
    }

    #[test]
    fn test_method_call_not_indexable() {
        let catalog = catalog();
        let field = FieldRef::from_items(vec![FieldItem::Field("name".into())]).with_method("toLowerCase", vec![]);
        let condition = Condition::new(Operand::Field(field), Operator::Equals, Operand::value(json!("ann")));
        assert!(analyze(&catalog, &condition)[0].is_empty());
    }

    #[test]
    fn test_parameters() {
        let catalog = catalog();
        let analyzer = FilterAnalyzer::new(&catalog);
        let condition = Condition::with_parameter("name", Operator::Equals, "who");

        let unbound = analyzer.analyze_main_condition(Some(&condition), "Student", &QueryContext::new());
        assert!(unbound[0].is_empty());

        let ctx = QueryContext::new().with_parameter("who", json!("ann"));
        let bound = analyzer.analyze_main_condition(Some(&condition), "Student", &ctx);
        assert_eq!(bound[0][0].last_value, json!("ann"));
    }

    #[test]
    fn test_chain_candidate_checks_every_hop() {
        let catalog = catalog();
        let indexed = analyze(&catalog, &Condition::eq("group.name", json!("math")));
        assert_eq!(indexed[0].len(), 1);
        assert!(indexed[0][0].last_field.is_long());

        let analyzer = FilterAnalyzer::new(&catalog);
        assert!(analyzer.check_index_existence("Student", &indexed[0][0]));

        let missing = SearchCandidate::new(
            Operator::Equals,
            crate::filter::FieldChain::parse("group.title").unwrap(),
            json!("x"),
        );
        assert!(!analyzer.check_index_existence("Student", &missing));
    }
}
