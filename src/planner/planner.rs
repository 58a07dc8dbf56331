//! Query planner
//!
//! Plans a filtered read over one class:
//! 1. Rewrite paired range comparisons into BETWEEN
//! 2. Split the condition at OR nodes and analyze each branch
//! 3. Select an index for every branch
//!
//! A plan uses indexes only when every OR branch has one; otherwise the
//! caller scans the class. The same inputs always produce the same plan.

use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::filter::Condition;
use crate::observability::{log_event, Event, IndexUsageSink, NoopUsageSink};
use crate::schema::IndexCatalog;

use super::analyzer::FilterAnalyzer;
use super::chain::ProxyOptions;
use super::context::QueryContext;
use super::errors::{PlanResult, PlanningError};
use super::selector::{IndexSelector, SelectedIndex};

/// How a plan reads its records
#[derive(Debug, Clone)]
pub enum ScanType {
    /// One selected index per OR branch
    Index(Vec<SelectedIndex>),
    /// No usable index; the caller scans the whole class
    FullScan { reason: String },
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Index(_) => "INDEX",
            ScanType::FullScan { .. } => "FULL_SCAN",
        }
    }

    pub fn is_full_scan(&self) -> bool {
        matches!(self, ScanType::FullScan { .. })
    }
}

/// Immutable query plan
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub class: String,
    /// The condition after range rewriting
    pub condition: Option<Condition>,
    pub scan: ScanType,
}

impl QueryPlan {
    /// Selected indexes, one per OR branch; empty for a full scan
    pub fn branches(&self) -> &[SelectedIndex] {
        match &self.scan {
            ScanType::Index(branches) => branches,
            ScanType::FullScan { .. } => &[],
        }
    }
}

pub struct QueryPlanner<'a> {
    catalog: &'a dyn IndexCatalog,
    config: PlannerConfig,
    stats: Arc<dyn IndexUsageSink>,
}

impl<'a> QueryPlanner<'a> {
    /// Planner with default configuration and no statistics sink
    pub fn new(catalog: &'a dyn IndexCatalog) -> Self {
        Self {
            catalog,
            config: PlannerConfig::default(),
            stats: Arc::new(NoopUsageSink),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sink receiving index usage from chained proxies built by this planner
    pub fn with_usage_sink(mut self, stats: Arc<dyn IndexUsageSink>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans a read of `class` filtered by `condition`.
    ///
    /// Only an unknown class is an error; anything that merely prevents
    /// index use produces a full-scan plan.
    pub fn plan(&self, class: &str, condition: Option<&Condition>, ctx: &QueryContext) -> PlanResult<QueryPlan> {
        if self.catalog.class(class).is_none() {
            return Err(PlanningError::ClassNotFound(class.to_string()));
        }

        let Some(condition) = condition else {
            return Ok(self.full_scan(class, None, "no condition"));
        };
        let mut condition = condition.clone();
        condition.merge_ranges_into_between();

        let hierarchy = FilterAnalyzer::new(self.catalog).analyze_main_condition(Some(&condition), class, ctx);
        if hierarchy.is_empty() {
            return Ok(self.full_scan(class, Some(condition), "no indexable condition"));
        }

        let options = ProxyOptions::from_config(&self.config, self.stats.clone(), ctx.interrupt().clone());
        let selector = IndexSelector::new(self.catalog, &self.config, options);

        let mut branches = Vec::with_capacity(hierarchy.len());
        for (branch, candidates) in hierarchy.iter().enumerate() {
            match selector.select(class, candidates) {
                Some(selected) => branches.push(selected),
                None => {
                    let reason = format!("no usable index for condition branch {}", branch);
                    return Ok(self.full_scan(class, Some(condition), &reason));
                }
            }
        }

        Ok(QueryPlan {
            class: class.to_string(),
            condition: Some(condition),
            scan: ScanType::Index(branches),
        })
    }

    fn full_scan(&self, class: &str, condition: Option<Condition>, reason: &str) -> QueryPlan {
        log_event(Event::FullScanFallback, &[("class", class), ("reason", reason)]);
        QueryPlan {
            class: class.to_string(),
            condition,
            scan: ScanType::FullScan {
                reason: reason.to_string(),
            },
        }
    }
}
