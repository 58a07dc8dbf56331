//! Index read/write contract
//!
//! Every index handle the planner hands to the executor implements [`Index`],
//! whether it is a real single index or a chain of indexes composed into a
//! virtual one. Read operations return lazy [`EntryStream`]s so a caller
//! that stops early (LIMIT) does not pay for the rest.

use std::collections::BTreeSet;
use std::fmt;

use super::definition::{IndexDefinition, IndexKind};
use super::errors::IndexResult;
use super::key::{IndexKey, Rid};

/// One `(key, record)` pair produced by an index read.
///
/// The key is absent when the entry was produced through a chain and no
/// single key of the base index describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Option<IndexKey>,
    pub rid: Rid,
}

impl IndexEntry {
    pub fn new(key: Option<IndexKey>, rid: Rid) -> Self {
        Self { key, rid }
    }
}

/// Lazy cursor over index entries
pub type EntryStream<'a> = Box<dyn Iterator<Item = IndexResult<IndexEntry>> + 'a>;

/// Collects the record ids of a stream, stopping at the first error.
pub fn collect_rids(stream: EntryStream<'_>) -> IndexResult<Vec<Rid>> {
    stream.map(|entry| entry.map(|e| e.rid)).collect()
}

/// Secondary index handle.
///
/// Handles are shared between concurrently running queries, so
/// implementations must be `Send + Sync` and must not hold internal locks
/// beyond a single call.
pub trait Index: Send + Sync + fmt::Debug {
    /// Index name
    fn name(&self) -> &str;

    /// Name of the database owning the index
    fn database_name(&self) -> &str;

    fn kind(&self) -> IndexKind;

    /// Storage algorithm name
    fn algorithm(&self) -> &str;

    fn definition(&self) -> &IndexDefinition;

    fn is_unique(&self) -> bool {
        self.kind().is_unique()
    }

    fn has_range_query_support(&self) -> bool {
        self.kind().supports_range()
    }

    fn can_be_used_in_equality_operators(&self) -> bool {
        true
    }

    fn supports_ordered_iterations(&self) -> bool {
        self.has_range_query_support()
    }

    /// Names of the concrete indexes behind this handle, base first
    fn index_names(&self) -> Vec<String> {
        vec![self.name().to_string()]
    }

    /// True for composed handles that resolve through several indexes
    fn is_chained(&self) -> bool {
        false
    }

    // Reads

    /// Record ids stored under an exact key
    fn get(&self, key: &IndexKey) -> IndexResult<Vec<Rid>>;

    /// Entries for each key of an exact key set
    fn entries<'a>(&'a self, keys: &BTreeSet<IndexKey>, ascending: bool) -> IndexResult<EntryStream<'a>>;

    /// Entries with keys between `from` and `to`
    fn entries_between<'a>(
        &'a self,
        from: &IndexKey,
        from_inclusive: bool,
        to: &IndexKey,
        to_inclusive: bool,
        ascending: bool,
    ) -> IndexResult<EntryStream<'a>>;

    /// Entries with keys above `from`
    fn entries_major<'a>(&'a self, from: &IndexKey, inclusive: bool, ascending: bool) -> IndexResult<EntryStream<'a>>;

    /// Entries with keys below `to`
    fn entries_minor<'a>(&'a self, to: &IndexKey, inclusive: bool, ascending: bool) -> IndexResult<EntryStream<'a>>;

    /// Record ids for every key of a key set
    fn get_values(&self, keys: &BTreeSet<IndexKey>) -> IndexResult<Vec<Rid>> {
        collect_rids(self.entries(keys, true)?)
    }

    /// Number of entries
    fn size(&self) -> IndexResult<u64>;

    // Mutations

    fn create(&self) -> IndexResult<()>;

    fn put(&self, key: IndexKey, rid: Rid) -> IndexResult<()>;

    /// Removes one record (or every record when `rid` is `None`) under a key
    fn remove(&self, key: &IndexKey, rid: Option<Rid>) -> IndexResult<bool>;

    fn clear(&self) -> IndexResult<()>;

    /// Rebuilds the index, returning the number of entries indexed
    fn rebuild(&self) -> IndexResult<u64>;

    fn flush(&self) -> IndexResult<()>;

    fn delete(&self) -> IndexResult<()>;
}
