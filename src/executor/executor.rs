//! Index fetch for query plans
//!
//! Execution flow:
//! 1. Open one index cursor per OR branch
//! 2. Stream record ids branch after branch
//! 3. Drop records already produced by an earlier branch
//! 4. Stop at the limit
//!
//! Record loading, residual filtering, projection and ordering belong to
//! the caller.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::index::{EntryStream, IndexError, IndexResult, Rid};
use crate::observability::{log_event, record_index_usage, Event, IndexUsage, IndexUsageSink, NoopUsageSink};
use crate::planner::{QueryPlan, ScanType, SelectedIndex};

/// What the caller has to do to answer a plan
pub enum FetchOutcome<'p> {
    /// Record ids from the plan's indexes
    Index(IndexFetch<'p>),
    /// Scan every record of the class
    FullScan { reason: String },
}

impl FetchOutcome<'_> {
    pub fn is_full_scan(&self) -> bool {
        matches!(self, FetchOutcome::FullScan { .. })
    }
}

/// Opens index cursors for query plans
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    stats: Arc<dyn IndexUsageSink>,
    statistics_enabled: bool,
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new(Arc::new(NoopUsageSink))
    }
}

impl QueryExecutor {
    pub fn new(stats: Arc<dyn IndexUsageSink>) -> Self {
        Self {
            stats,
            statistics_enabled: true,
        }
    }

    pub fn from_config(config: &PlannerConfig, stats: Arc<dyn IndexUsageSink>) -> Self {
        Self::new(stats).with_statistics(config.statistics_enabled)
    }

    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    /// Opens the plan's index cursors.
    ///
    /// An index engine failure while opening a cursor turns the plan into a
    /// full scan. Key conversion errors, cancellation and unsupported
    /// operations are returned to the caller.
    pub fn fetch<'p>(&self, plan: &'p QueryPlan, limit: Option<usize>) -> IndexResult<FetchOutcome<'p>> {
        let branches = match &plan.scan {
            ScanType::FullScan { reason } => {
                return Ok(FetchOutcome::FullScan { reason: reason.clone() });
            }
            ScanType::Index(branches) => branches,
        };

        let mut streams = Vec::with_capacity(branches.len());
        for selected in branches {
            match self.open_branch(selected) {
                Ok(Some(stream)) => streams.push(stream),
                Ok(None) => {
                    let reason = format!(
                        "index '{}' cannot serve operator {}",
                        selected.index.name(),
                        selected.candidate.last_operator
                    );
                    log_event(Event::FullScanFallback, &[("class", &plan.class), ("reason", &reason)]);
                    return Ok(FetchOutcome::FullScan { reason });
                }
                Err(IndexError::Engine(message)) => {
                    log_event(
                        Event::IndexQueryFailed,
                        &[("index", selected.index.name()), ("error", &message)],
                    );
                    return Ok(FetchOutcome::FullScan {
                        reason: format!("index '{}' failed: {}", selected.index.name(), message),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(FetchOutcome::Index(IndexFetch::new(streams, limit)))
    }

    fn open_branch<'p>(&self, selected: &'p SelectedIndex) -> IndexResult<Option<EntryStream<'p>>> {
        let index = selected.index.as_ref();
        let stream = selected
            .candidate
            .last_operator
            .execute_index_query(index, &selected.key_params, true)?;

        // chained proxies account for their own hops
        if stream.is_some() && self.statistics_enabled && !index.is_chained() {
            record_index_usage(
                self.stats.as_ref(),
                &IndexUsage {
                    database: index.database_name(),
                    index_name: index.name(),
                    param_count: index.definition().param_count(),
                    key_param_count: Some(selected.key_params.len()),
                },
            );
        }
        Ok(stream)
    }
}

/// Lazy, de-duplicated stream of record ids over every plan branch.
///
/// Fuses after the first error.
pub struct IndexFetch<'p> {
    streams: std::vec::IntoIter<EntryStream<'p>>,
    current: Option<EntryStream<'p>>,
    seen: HashSet<Rid>,
    remaining: Option<usize>,
    failed: bool,
}

impl<'p> IndexFetch<'p> {
    fn new(streams: Vec<EntryStream<'p>>, limit: Option<usize>) -> Self {
        let mut streams = streams.into_iter();
        let current = streams.next();
        Self {
            streams,
            current,
            seen: HashSet::new(),
            remaining: limit,
            failed: false,
        }
    }

    /// Number of distinct records produced so far
    pub fn produced(&self) -> usize {
        self.seen.len()
    }
}

impl Iterator for IndexFetch<'_> {
    type Item = IndexResult<Rid>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == Some(0) {
            return None;
        }

        loop {
            let stream = self.current.as_mut()?;
            match stream.next() {
                Some(Ok(entry)) => {
                    if !self.seen.insert(entry.rid) {
                        continue;
                    }
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(Ok(entry.rid));
                }
                Some(Err(err)) => {
                    self.failed = true;
                    return Some(Err(err));
                }
                None => self.current = self.streams.next(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Condition;
    use crate::index::{Index, IndexDefinition, IndexKey, IndexKind, KeyType, MemoryIndex};
    use crate::observability::MetricsRegistry;
    use crate::planner::{QueryContext, QueryPlanner};
    use crate::schema::{MemoryCatalog, PropertyDescriptor, PropertyType, SchemaClass};
    use serde_json::json;

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        catalog
            .add_class(
                SchemaClass::new("Person")
                    .with_property(PropertyDescriptor::new("age", PropertyType::Integer))
                    .with_property(PropertyDescriptor::new("city", PropertyType::String)),
            )
            .unwrap();

        let age = MemoryIndex::new(
            "Person.age",
            IndexKind::NotUnique,
            IndexDefinition::single("Person", "age", KeyType::Integer),
        );
        let city = MemoryIndex::new(
            "Person.city",
            IndexKind::NotUnique,
            IndexDefinition::single("Person", "city", KeyType::String),
        );
        for p in 0..5 {
            age.put(IndexKey::Int(20 + p), Rid::new(1, p)).unwrap();
        }
        city.put(IndexKey::String("Rome".into()), Rid::new(1, 0)).unwrap();
        city.put(IndexKey::String("Rome".into()), Rid::new(1, 9)).unwrap();

        catalog.add_index(Arc::new(age)).unwrap();
        catalog.add_index(Arc::new(city)).unwrap();
        catalog
    }

    fn plan(catalog: &MemoryCatalog, condition: &Condition) -> QueryPlan {
        QueryPlanner::new(catalog)
            .plan("Person", Some(condition), &QueryContext::new())
            .unwrap()
    }

    fn rids(outcome: FetchOutcome<'_>) -> Vec<Rid> {
        match outcome {
            FetchOutcome::Index(fetch) => fetch.collect::<IndexResult<Vec<_>>>().unwrap(),
            FetchOutcome::FullScan { reason } => panic!("unexpected full scan: {}", reason),
        }
    }

    #[test]
    fn test_fetch_equality() {
        let catalog = catalog();
        let plan = plan(&catalog, &Condition::eq("age", json!(22)));
        let outcome = QueryExecutor::default().fetch(&plan, None).unwrap();
        assert_eq!(rids(outcome), vec![Rid::new(1, 2)]);
    }

    #[test]
    fn test_or_branches_deduplicated() {
        let catalog = catalog();
        let condition = Condition::or(Condition::eq("age", json!(20)), Condition::eq("city", json!("Rome")));
        let plan = plan(&catalog, &condition);
        let outcome = QueryExecutor::default().fetch(&plan, None).unwrap();
        assert_eq!(rids(outcome), vec![Rid::new(1, 0), Rid::new(1, 9)]);
    }

    #[test]
    fn test_limit() {
        let catalog = catalog();
        let plan = plan(&catalog, &Condition::compare("age", crate::filter::Operator::Major, json!(0)));
        let outcome = QueryExecutor::default().fetch(&plan, Some(2)).unwrap();
        assert_eq!(rids(outcome), vec![Rid::new(1, 0), Rid::new(1, 1)]);
    }

    #[test]
    fn test_full_scan_plan_passes_through() {
        let catalog = catalog();
        let plan = QueryPlanner::new(&catalog)
            .plan("Person", None, &QueryContext::new())
            .unwrap();
        let outcome = QueryExecutor::default().fetch(&plan, None).unwrap();
        assert!(outcome.is_full_scan());
    }

    #[test]
    fn test_key_conversion_error_propagates() {
        let catalog = catalog();
        let plan = plan(&catalog, &Condition::eq("age", json!("not a number")));
        let err = QueryExecutor::default().fetch(&plan, None).err().unwrap();
        assert_eq!(err.code(), "CHAINPLAN_INDEX_KEY_CONVERSION");
    }

    #[test]
    fn test_usage_recorded() {
        let catalog = catalog();
        let registry = Arc::new(MetricsRegistry::new());
        let plan = plan(&catalog, &Condition::eq("age", json!(21)));

        let executor = QueryExecutor::new(registry.clone());
        rids(executor.fetch(&plan, None).unwrap());
        assert_eq!(registry.counter("index.Person.age.used"), 1);

        let silent = QueryExecutor::new(registry.clone()).with_statistics(false);
        rids(silent.fetch(&plan, None).unwrap());
        assert_eq!(registry.counter("index.Person.age.used"), 1);
    }

    #[test]
    fn test_composite_prefix_usage_recorded() {
        let mut catalog = MemoryCatalog::new();
        catalog
            .add_class(
                SchemaClass::new("Pair")
                    .with_property(PropertyDescriptor::new("a", PropertyType::Integer))
                    .with_property(PropertyDescriptor::new("b", PropertyType::Integer)),
            )
            .unwrap();
        let pair = MemoryIndex::new(
            "Pair.a_b",
            IndexKind::NotUnique,
            IndexDefinition::composite("Pair", [("a", KeyType::Integer), ("b", KeyType::Integer)]),
        );
        pair.put(IndexKey::Composite(vec![IndexKey::Int(1), IndexKey::Int(2)]), Rid::new(3, 0))
            .unwrap();
        pair.put(IndexKey::Composite(vec![IndexKey::Int(2), IndexKey::Int(2)]), Rid::new(3, 1))
            .unwrap();
        catalog.add_index(Arc::new(pair)).unwrap();

        let plan = QueryPlanner::new(&catalog)
            .plan("Pair", Some(&Condition::eq("a", json!(1))), &QueryContext::new())
            .unwrap();
        let registry = Arc::new(MetricsRegistry::new());
        let outcome = QueryExecutor::new(registry.clone()).fetch(&plan, None).unwrap();
        assert_eq!(rids(outcome), vec![Rid::new(3, 0)]);

        assert_eq!(registry.counter("db.default.query.indexUsed"), 1);
        assert_eq!(registry.counter("db.default.query.compositeIndexUsed"), 1);
        assert_eq!(registry.counter("db.default.query.compositeIndexUsed.2"), 1);
        assert_eq!(registry.counter("db.default.query.compositeIndexUsed.2.1"), 1);
        assert_eq!(registry.counter("index.Pair.a_b.used"), 1);
    }
}
