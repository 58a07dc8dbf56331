//! BTreeMap-backed in-memory index
//!
//! Entries live in a `BTreeMap<IndexKey, Vec<Rid>>` for deterministic
//! ordering; record ids under one key are kept sorted ascending.
//!
//! The tree sits behind a `RwLock` that is held only for the duration of a
//! single call. Range reads snapshot the matching entries before returning,
//! so a cursor never keeps the lock while a caller probes another index.

use std::cmp::Ordering as KeyOrdering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::definition::{IndexDefinition, IndexKind};
use super::errors::{IndexError, IndexResult};
use super::index::{EntryStream, Index, IndexEntry};
use super::key::{IndexKey, Rid};

type Tree = BTreeMap<IndexKey, Vec<Rid>>;

/// In-memory secondary index
#[derive(Debug)]
pub struct MemoryIndex {
    name: String,
    database: String,
    kind: IndexKind,
    algorithm: String,
    definition: IndexDefinition,
    tree: RwLock<Tree>,
    /// Number of read calls served
    probes: AtomicU64,
}

impl MemoryIndex {
    /// Creates an empty index
    pub fn new(name: impl Into<String>, kind: IndexKind, definition: IndexDefinition) -> Self {
        Self {
            name: name.into(),
            database: "default".to_string(),
            kind,
            algorithm: kind.default_algorithm().to_string(),
            definition,
            tree: RwLock::new(BTreeMap::new()),
            probes: AtomicU64::new(0),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Number of read operations served so far
    pub fn probe_count(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> IndexResult<usize> {
        Ok(self.read_tree()?.len())
    }

    fn read_tree(&self) -> IndexResult<RwLockReadGuard<'_, Tree>> {
        self.tree
            .read()
            .map_err(|_| IndexError::Engine(format!("index '{}' lock poisoned", self.name)))
    }

    fn write_tree(&self) -> IndexResult<RwLockWriteGuard<'_, Tree>> {
        self.tree
            .write()
            .map_err(|_| IndexError::Engine(format!("index '{}' lock poisoned", self.name)))
    }

    fn record_probe(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
    }

    fn require_range_support(&self, operation: &'static str) -> IndexResult<()> {
        if self.has_range_query_support() {
            Ok(())
        } else {
            Err(IndexError::unsupported(&self.name, operation))
        }
    }

    /// Snapshots entries between optional bounds.
    ///
    /// Bounds compare by prefix, so a partial composite bound matches every
    /// full key that starts with it.
    fn scan(
        &self,
        from: Option<(&IndexKey, bool)>,
        to: Option<(&IndexKey, bool)>,
        ascending: bool,
    ) -> IndexResult<EntryStream<'_>> {
        self.record_probe();
        let tree = self.read_tree()?;

        let lower = match from {
            Some((key, _)) => Bound::Included(key.clone()),
            None => Bound::Unbounded,
        };

        let mut entries = Vec::new();
        for (key, rids) in tree.range((lower, Bound::Unbounded)) {
            if let Some((from, false)) = from {
                if key.compare_prefix(from) == KeyOrdering::Equal {
                    continue;
                }
            }
            if let Some((to, inclusive)) = to {
                match key.compare_prefix(to) {
                    KeyOrdering::Greater => break,
                    KeyOrdering::Equal if !inclusive => break,
                    _ => {}
                }
            }
            entries.extend(rids.iter().map(|rid| IndexEntry::new(Some(key.clone()), *rid)));
        }
        drop(tree);

        if !ascending {
            entries.reverse();
        }
        Ok(Box::new(entries.into_iter().map(Ok)))
    }
}

impl Index for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    fn kind(&self) -> IndexKind {
        self.kind
    }

    fn algorithm(&self) -> &str {
        &self.algorithm
    }

    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    fn get(&self, key: &IndexKey) -> IndexResult<Vec<Rid>> {
        self.record_probe();
        Ok(self.read_tree()?.get(key).cloned().unwrap_or_default())
    }

    fn entries<'a>(&'a self, keys: &BTreeSet<IndexKey>, ascending: bool) -> IndexResult<EntryStream<'a>> {
        self.record_probe();
        let tree = self.read_tree()?;

        let lookup = |key: &IndexKey| {
            tree.get(key)
                .into_iter()
                .flatten()
                .map(|rid| IndexEntry::new(Some(key.clone()), *rid))
                .collect::<Vec<_>>()
        };
        let entries: Vec<IndexEntry> = if ascending {
            keys.iter().flat_map(lookup).collect()
        } else {
            keys.iter().rev().flat_map(lookup).collect()
        };
        drop(tree);

        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn entries_between<'a>(
        &'a self,
        from: &IndexKey,
        from_inclusive: bool,
        to: &IndexKey,
        to_inclusive: bool,
        ascending: bool,
    ) -> IndexResult<EntryStream<'a>> {
        self.require_range_support("entries_between")?;
        self.scan(Some((from, from_inclusive)), Some((to, to_inclusive)), ascending)
    }

    fn entries_major<'a>(&'a self, from: &IndexKey, inclusive: bool, ascending: bool) -> IndexResult<EntryStream<'a>> {
        self.require_range_support("entries_major")?;
        self.scan(Some((from, inclusive)), None, ascending)
    }

    fn entries_minor<'a>(&'a self, to: &IndexKey, inclusive: bool, ascending: bool) -> IndexResult<EntryStream<'a>> {
        self.require_range_support("entries_minor")?;
        self.scan(None, Some((to, inclusive)), ascending)
    }

    fn size(&self) -> IndexResult<u64> {
        Ok(self.read_tree()?.values().map(|v| v.len() as u64).sum())
    }

    fn create(&self) -> IndexResult<()> {
        self.clear()
    }

    /// Insert a record id for a key, keeping ids sorted ascending.
    ///
    /// Null keys are skipped when the definition ignores nulls.
    fn put(&self, key: IndexKey, rid: Rid) -> IndexResult<()> {
        if key.is_null() && self.definition.is_null_values_ignored() {
            return Ok(());
        }

        let mut tree = self.write_tree()?;
        let rids = tree.entry(key.clone()).or_default();

        if self.kind.is_unique() && rids.iter().any(|existing| *existing != rid) {
            return Err(IndexError::DuplicateKey {
                index: self.name.clone(),
                key,
            });
        }

        match rids.binary_search(&rid) {
            Ok(_) => {}
            Err(pos) => rids.insert(pos, rid),
        }
        Ok(())
    }

    /// If the key has no more record ids, removes the key entirely.
    fn remove(&self, key: &IndexKey, rid: Option<Rid>) -> IndexResult<bool> {
        let mut tree = self.write_tree()?;
        let Some(rids) = tree.get_mut(key) else {
            return Ok(false);
        };

        let removed = match rid {
            Some(rid) => match rids.binary_search(&rid) {
                Ok(pos) => {
                    rids.remove(pos);
                    true
                }
                Err(_) => false,
            },
            None => {
                rids.clear();
                true
            }
        };

        if rids.is_empty() {
            tree.remove(key);
        }
        Ok(removed)
    }

    fn clear(&self) -> IndexResult<()> {
        self.write_tree()?.clear();
        Ok(())
    }

    /// In-memory entries are their own source of truth; rebuilding only
    /// reports the entry count.
    fn rebuild(&self) -> IndexResult<u64> {
        self.size()
    }

    fn flush(&self) -> IndexResult<()> {
        Ok(())
    }

    fn delete(&self) -> IndexResult<()> {
        self.clear()
    }
}
