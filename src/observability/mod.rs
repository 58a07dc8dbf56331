//! Observability subsystem for the planner
//!
//! This module provides:
//! - Named lifecycle events emitted through `tracing`
//! - Index usage statistics behind an injectable sink
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on planning or execution results
//! 3. Statistics failures are swallowed, never surfaced
//!
//! # Usage
//!
//! ```ignore
//! use chainplan::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::FullScanFallback, &[("class", "Student")]);
//!
//! let metrics = MetricsRegistry::new();
//! let planner = QueryPlanner::new(&catalog).with_usage_sink(Arc::new(metrics));
//! ```

mod events;
mod metrics;

pub use events::Event;
pub use metrics::{
    record_index_usage, IndexUsage, IndexUsageSink, MetricsRegistry, MetricsSnapshot, NoopUsageSink,
};

use std::fmt;

use tracing::Level;

/// Observability error
///
/// Observability failure must never fail a query.
#[derive(Debug, Clone)]
pub struct ObservabilityError {
    message: String,
}

impl ObservabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the string error code
    pub fn code(&self) -> &'static str {
        "CHAINPLAN_OBSERVABILITY_FAILED"
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Observability errors are never fatal
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl std::error::Error for ObservabilityError {}

/// Result type for observability operations
pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

/// Log an event with fields at the event's level
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let fields = render_fields(fields);
    let level = event.level();
    if level == Level::ERROR {
        tracing::error!(event = %event, %fields);
    } else if level == Level::WARN {
        tracing::warn!(event = %event, %fields);
    } else if level == Level::INFO {
        tracing::info!(event = %event, %fields);
    } else if level == Level::DEBUG {
        tracing::debug!(event = %event, %fields);
    } else {
        tracing::trace!(event = %event, %fields);
    }
}

fn render_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observability_error_not_fatal() {
        let err = ObservabilityError::new("test error");
        assert!(!err.is_fatal());
        assert_eq!(err.message(), "test error");
    }

    #[test]
    fn test_observability_error_display() {
        let err = ObservabilityError::new("test message");
        let display = format!("{}", err);
        assert!(display.contains("CHAINPLAN_OBSERVABILITY_FAILED"));
        assert!(display.contains("test message"));
    }

    #[test]
    fn test_render_fields() {
        assert_eq!(
            render_fields(&[("class", "Student"), ("index", "Student.group")]),
            "class=Student index=Student.group"
        );
        assert_eq!(render_fields(&[]), "");
    }

    #[test]
    fn test_log_event() {
        // This just verifies no panic
        log_event(Event::FullScanFallback, &[("class", "Student")]);
        log_event(Event::ProxyMutationRejected, &[]);
    }
}
