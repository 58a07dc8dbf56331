//! Index subsystem
//!
//! Defines the contract every secondary index handle satisfies, the key
//! model shared by all indexes, and an ordered in-memory implementation.
//!
//! # Design Principles
//!
//! - Deterministic: keys are totally ordered, record ids sorted ascending
//! - Lazy: range reads hand out cursors, not materialized result sets
//! - Shared: handles are `Send + Sync`; locks never outlive a single call
//!
//! # Key Conversion
//!
//! Filter operands and record ids always pass through the target index's
//! own key construction ([`IndexDefinition::create_value`]), so composite
//! indexes receive correctly shaped (possibly partial) composite keys.

mod definition;
mod errors;
mod index;
mod key;
mod memory;

pub use definition::{IndexDefinition, IndexKind};
pub use errors::{IndexError, IndexResult, KeyConversionError};
pub use index::{collect_rids, EntryStream, Index, IndexEntry};
pub use key::{prepare_keys, prepare_value_keys, IndexKey, KeyType, Rid};
pub use memory::MemoryIndex;
