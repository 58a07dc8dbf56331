//! chainplan - index selection and chained index resolution
//!
//! Decides which secondary indexes can answer a filtered read over a schema
//! class, and answers dotted field chains (`a.b.c = X`) by composing one
//! index per hop into a virtual index.
//!
//! ```ignore
//! use chainplan::executor::{FetchOutcome, QueryExecutor};
//! use chainplan::filter::Condition;
//! use chainplan::planner::{QueryContext, QueryPlanner};
//!
//! let plan = QueryPlanner::new(&catalog).plan("Student", Some(&condition), &QueryContext::new())?;
//! match QueryExecutor::default().fetch(&plan, Some(10))? {
//!     FetchOutcome::Index(rids) => { /* load records */ }
//!     FetchOutcome::FullScan { reason } => { /* scan the class */ }
//! }
//! ```

pub mod config;
pub mod executor;
pub mod filter;
pub mod index;
pub mod observability;
pub mod planner;
pub mod schema;
