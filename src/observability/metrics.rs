//! Index usage statistics
//!
//! - Counters only, keyed by metric name
//! - Monotonic increase
//! - Thread-safe; probes from concurrent queries increment the same counters
//!
//! Metric names:
//! - `db.<database>.query.indexUsed`
//! - `db.<database>.query.compositeIndexUsed`
//! - `db.<database>.query.compositeIndexUsed.<param count>`
//! - `db.<database>.query.compositeIndexUsed.<param count>.<key param count>`
//! - `index.<name>.used`

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::Serialize;

use super::events::Event;
use super::{log_event, ObservabilityError, ObservabilityResult};

/// One probe of one concrete index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexUsage<'a> {
    pub database: &'a str,
    pub index_name: &'a str,
    /// Number of fields the probed index declares
    pub param_count: usize,
    /// Number of key values the probe was given, when known
    pub key_param_count: Option<usize>,
}

/// Destination for index usage statistics.
///
/// Passed into planners and chained proxies instead of living in a
/// process-wide singleton, so each database or test can have its own.
pub trait IndexUsageSink: Send + Sync + fmt::Debug {
    /// Whether updates are currently collected
    fn is_recording(&self) -> bool {
        true
    }

    fn record(&self, usage: &IndexUsage<'_>) -> ObservabilityResult<()>;
}

/// Records one probe, dropping any failure.
///
/// Statistics never influence query results.
pub fn record_index_usage(sink: &dyn IndexUsageSink, usage: &IndexUsage<'_>) {
    if !sink.is_recording() {
        return;
    }
    if let Err(err) = sink.record(usage) {
        log_event(
            Event::StatsUpdateFailed,
            &[("index", usage.index_name), ("error", &err.to_string())],
        );
    }
}

/// Sink that discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUsageSink;

impl IndexUsageSink for NoopUsageSink {
    fn is_recording(&self) -> bool {
        false
    }

    fn record(&self, _usage: &IndexUsage<'_>) -> ObservabilityResult<()> {
        Ok(())
    }
}

/// Named usage counters.
///
/// Uses Relaxed ordering; counters are statistics, not synchronization.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: RwLock<HashMap<String, AtomicU64>>,
}

impl MetricsRegistry {
    /// Create a new registry with no counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a named counter, creating it on first use
    pub fn increment(&self, name: &str) -> ObservabilityResult<()> {
        {
            let counters = self
                .counters
                .read()
                .map_err(|_| ObservabilityError::new("metrics registry lock poisoned"))?;
            if let Some(counter) = counters.get(name) {
                counter.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        }

        let mut counters = self
            .counters
            .write()
            .map_err(|_| ObservabilityError::new("metrics registry lock poisoned"))?;
        counters
            .entry(name.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Current value of a counter (zero if never incremented)
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .ok()
            .and_then(|counters| counters.get(name).map(|c| c.load(Ordering::Relaxed)))
            .unwrap_or(0)
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .read()
            .map(|counters| {
                counters
                    .iter()
                    .map(|(name, value)| (name.clone(), value.load(Ordering::Relaxed)))
                    .collect()
            })
            .unwrap_or_default();
        MetricsSnapshot { counters }
    }

    /// Current snapshot as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot().counters).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn index_used_metric(database: &str) -> String {
        format!("db.{}.query.indexUsed", database)
    }

    pub fn composite_index_used_metric(database: &str) -> String {
        format!("db.{}.query.compositeIndexUsed", database)
    }

    pub fn composite_index_params_metric(database: &str, param_count: usize) -> String {
        format!("db.{}.query.compositeIndexUsed.{}", database, param_count)
    }

    pub fn composite_index_key_params_metric(database: &str, param_count: usize, key_param_count: usize) -> String {
        format!(
            "db.{}.query.compositeIndexUsed.{}.{}",
            database, param_count, key_param_count
        )
    }

    pub fn per_index_metric(index_name: &str) -> String {
        format!("index.{}.used", index_name)
    }
}

impl IndexUsageSink for MetricsRegistry {
    fn record(&self, usage: &IndexUsage<'_>) -> ObservabilityResult<()> {
        self.increment(&Self::index_used_metric(usage.database))?;
        if usage.param_count > 1 {
            self.increment(&Self::composite_index_used_metric(usage.database))?;
            self.increment(&Self::composite_index_params_metric(
                usage.database,
                usage.param_count,
            ))?;
            if let Some(key_param_count) = usage.key_param_count {
                self.increment(&Self::composite_index_key_params_metric(
                    usage.database,
                    usage.param_count,
                    key_param_count,
                ))?;
            }
        }
        self.increment(&Self::per_index_metric(usage.index_name))
    }
}

/// A point-in-time copy of every counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}
