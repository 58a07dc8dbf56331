//! Planner events
//!
//! Every notable planning and execution point has a named event. Events are
//! explicit and typed; the string form is what ends up in the `event` field
//! of the emitted log record.

use std::fmt;

use tracing::Level;

/// Observable planner events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Analysis
    /// Condition tree analyzed into candidates
    CandidatesAnalyzed,

    // Selection
    /// An index (plain or chained) was chosen for a candidate
    IndexSelected,
    /// A chained index proxy was built
    IndexChainBuilt,
    /// A field chain could not be resolved into an index chain
    IndexChainRejected,

    // Execution
    /// An index probe failed; the query continues with a scan
    IndexQueryFailed,
    /// No usable index; the caller must scan
    FullScanFallback,
    /// A mutation was attempted on a chained proxy
    ProxyMutationRejected,

    // Statistics
    /// A usage statistics update failed and was dropped
    StatsUpdateFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CandidatesAnalyzed => "CANDIDATES_ANALYZED",
            Event::IndexSelected => "INDEX_SELECTED",
            Event::IndexChainBuilt => "INDEX_CHAIN_BUILT",
            Event::IndexChainRejected => "INDEX_CHAIN_REJECTED",
            Event::IndexQueryFailed => "INDEX_QUERY_FAILED",
            Event::FullScanFallback => "FULL_SCAN_FALLBACK",
            Event::ProxyMutationRejected => "PROXY_MUTATION_REJECTED",
            Event::StatsUpdateFailed => "STATS_UPDATE_FAILED",
        }
    }

    /// Level the event is emitted at
    pub fn level(&self) -> Level {
        match self {
            Event::ProxyMutationRejected => Level::ERROR,
            Event::IndexQueryFailed => Level::WARN,
            Event::StatsUpdateFailed => Level::TRACE,
            _ => Level::DEBUG,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::IndexChainBuilt.as_str(), "INDEX_CHAIN_BUILT");
        assert_eq!(Event::FullScanFallback.to_string(), "FULL_SCAN_FALLBACK");
    }

    #[test]
    fn test_event_levels() {
        assert_eq!(Event::ProxyMutationRejected.level(), Level::ERROR);
        assert_eq!(Event::IndexQueryFailed.level(), Level::WARN);
        assert_eq!(Event::IndexSelected.level(), Level::DEBUG);
        assert_eq!(Event::StatsUpdateFailed.level(), Level::TRACE);
    }
}
