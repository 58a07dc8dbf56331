//! Per-query planning and execution context

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::index::{IndexError, IndexResult};

/// Cancellation flag and optional deadline shared with the caller.
///
/// Clones share the flag, so the caller keeps one copy to cancel a running
/// query.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fails if the query was cancelled or ran past its deadline
    pub fn check(&self) -> IndexResult<()> {
        if self.is_cancelled() {
            return Err(IndexError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(IndexError::Timeout),
            _ => Ok(()),
        }
    }
}

/// Parameters and interrupt state for one query
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    parameters: HashMap<String, Value>,
    interrupt: Interrupt,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a named parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }
}
