//! Query planner subsystem for chainplan
//!
//! Decides, for a filtered read over a schema class, which secondary indexes
//! can answer the filter without a full scan. Dotted field chains
//! (`group.curator.name`) are answered by composing one index per hop into
//! a [`ChainedIndexProxy`] that behaves like any other index.
//!
//! # Design Principles
//!
//! - Deterministic: same inputs, same plan
//! - Analysis is pure; statistics move only when an index is probed
//! - A candidate that cannot use an index is skipped, never an error
//! - Every OR branch needs an index, or the plan is a full scan
//!
//! # Index Selection Priority
//!
//! 1. Candidates with more matched fields first
//! 2. Narrowest index covering the candidate
//! 3. For chains, one proxy per distinct last-hop index kind

mod analyzer;
mod candidate;
mod chain;
mod context;
mod errors;
mod explain;
mod planner;
mod selector;

pub use analyzer::FilterAnalyzer;
pub use candidate::SearchCandidate;
pub use chain::{find_best_index, is_appropriate_as_base, ChainedIndexProxy, ProxyOptions};
pub use context::{Interrupt, QueryContext};
pub use errors::{PlanResult, PlanningError};
pub use explain::{ExplainBranch, ExplainPlan};
pub use planner::{QueryPlan, QueryPlanner, ScanType};
pub use selector::{IndexSelector, SelectedIndex};
