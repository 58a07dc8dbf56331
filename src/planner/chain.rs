//! Chained index proxy
//!
//! Resolves a dotted field chain such as `group.curator.name = 'x'` through
//! one index per hop and presents the result as a single [`Index`].
//!
//! Hop 0 (the base) is indexed on the queried class; every following hop is
//! indexed on the class the previous hop's property links to. A read probes
//! the last hop with the caller's key, converts the record ids it returns
//! into keys of the hop before it, and repeats down to the base, whose
//! record ids are the answer.
//!
//! # Design Principles
//!
//! - Identity, key space, and range capability come from the last hop
//! - Range reads are resolved lazily, one last-hop entry at a time
//! - No index lock is held across hops
//! - Mutations are rejected
//! - Cancellation is checked between hops

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::filter::FieldChain;
use crate::index::{
    collect_rids, prepare_keys, EntryStream, Index, IndexDefinition, IndexEntry, IndexError, IndexKey, IndexKind,
    IndexResult, Rid,
};
use crate::observability::{log_event, record_index_usage, Event, IndexUsage, IndexUsageSink, NoopUsageSink};
use crate::schema::IndexCatalog;

use super::context::Interrupt;
use super::errors::{PlanResult, PlanningError};

/// Runtime settings shared by every proxy built in one planning pass
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    pub stats: Arc<dyn IndexUsageSink>,
    pub statistics_enabled: bool,
    pub max_chain_depth: usize,
    pub interrupt: Interrupt,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            stats: Arc::new(NoopUsageSink),
            statistics_enabled: true,
            max_chain_depth: 32,
            interrupt: Interrupt::new(),
        }
    }
}

impl ProxyOptions {
    pub fn from_config(config: &PlannerConfig, stats: Arc<dyn IndexUsageSink>, interrupt: Interrupt) -> Self {
        Self {
            stats,
            statistics_enabled: config.statistics_enabled,
            max_chain_depth: config.max_chain_depth,
            interrupt,
        }
    }

    pub fn with_stats(mut self, stats: Arc<dyn IndexUsageSink>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }
}

/// Several single-property indexes answering a field chain as one index
#[derive(Debug)]
pub struct ChainedIndexProxy {
    name: String,
    /// Base first
    chain: Vec<Arc<dyn Index>>,
    options: ProxyOptions,
}

impl ChainedIndexProxy {
    /// Wraps an already resolved chain of two or more indexes, base first.
    ///
    /// Each hop's indexed property must link to the class (or a superclass
    /// of the class) the next hop is defined on.
    pub fn new(catalog: &dyn IndexCatalog, chain: Vec<Arc<dyn Index>>, options: ProxyOptions) -> PlanResult<Self> {
        let names: Vec<String> = chain.iter().map(|index| index.name().to_string()).collect();
        if chain.len() < 2 {
            return Err(PlanningError::InvalidFieldChain {
                chain: names.join("."),
                reason: "an index chain needs at least two hops".to_string(),
            });
        }
        if chain.len() > options.max_chain_depth {
            return Err(PlanningError::ChainTooLong {
                chain: names.join("."),
                hops: chain.len(),
                limit: options.max_chain_depth,
            });
        }
        for pair in chain.windows(2) {
            check_link(catalog, pair[0].as_ref(), pair[1].as_ref()).map_err(|reason| {
                PlanningError::InvalidFieldChain {
                    chain: names.join("."),
                    reason,
                }
            })?;
        }

        Ok(Self {
            name: format!("IndexChain{{{}}}", names.join(", ")),
            chain,
            options,
        })
    }

    /// Builds one proxy per distinct last-hop index kind for a field chain
    /// starting at `class`.
    ///
    /// Fails when a hop cannot be resolved through the schema or an
    /// intermediate hop has no usable index. An empty result means the last
    /// property is not indexed.
    pub fn create_proxies(
        catalog: &dyn IndexCatalog,
        class: &str,
        chain: &FieldChain,
        options: &ProxyOptions,
    ) -> PlanResult<Vec<Arc<dyn Index>>> {
        validate_chain(chain, options)?;
        let classes = resolve_hop_classes(catalog, class, chain)?;

        let mut base_indexes = Vec::with_capacity(chain.item_count());
        for hop in 0..chain.item_count() - 1 {
            base_indexes.push(best_hop_index(catalog, &classes[hop], chain.item_name(hop))?);
        }

        Self::assemble(catalog, class, chain, &classes, base_indexes, options)
    }

    /// Builds proxies for a field chain whose base hop is served by `base`.
    pub fn create_proxies_for_field_chain(
        base: Arc<dyn Index>,
        chain: &FieldChain,
        catalog: &dyn IndexCatalog,
        options: &ProxyOptions,
    ) -> PlanResult<Vec<Arc<dyn Index>>> {
        validate_chain(chain, options)?;
        if base.definition().fields().first().map(String::as_str) != Some(chain.first()) {
            return Err(PlanningError::BaseIndexMismatch {
                index: base.name().to_string(),
                field: chain.first().to_string(),
            });
        }
        if !is_appropriate_as_base(base.as_ref()) {
            return Err(PlanningError::UnsuitableBaseIndex(base.name().to_string()));
        }

        let class = base.definition().class_name().to_string();
        let classes = resolve_hop_classes(catalog, &class, chain)?;

        let mut base_indexes = Vec::with_capacity(chain.item_count());
        base_indexes.push(base);
        for hop in 1..chain.item_count() - 1 {
            base_indexes.push(best_hop_index(catalog, &classes[hop], chain.item_name(hop))?);
        }

        Self::assemble(catalog, &class, chain, &classes, base_indexes, options)
    }

    fn assemble(
        catalog: &dyn IndexCatalog,
        class: &str,
        chain: &FieldChain,
        classes: &[String],
        base_indexes: Vec<Arc<dyn Index>>,
        options: &ProxyOptions,
    ) -> PlanResult<Vec<Arc<dyn Index>>> {
        let last_class = &classes[classes.len() - 1];
        let variants = last_index_variants(catalog, last_class, chain.last());

        let mut proxies: Vec<Arc<dyn Index>> = Vec::with_capacity(variants.len());
        for last in variants {
            let mut hops = base_indexes.clone();
            hops.push(last);
            let proxy = ChainedIndexProxy::new(catalog, hops, options.clone())?;
            log_event(
                Event::IndexChainBuilt,
                &[
                    ("class", class),
                    ("field", &chain.to_string()),
                    ("chain", proxy.name()),
                    ("hops", &proxy.chain.len().to_string()),
                ],
            );
            proxies.push(Arc::new(proxy));
        }
        Ok(proxies)
    }

    /// Hops, base first
    pub fn chain(&self) -> &[Arc<dyn Index>] {
        &self.chain
    }

    fn base(&self) -> &dyn Index {
        self.chain[0].as_ref()
    }

    fn last(&self) -> &dyn Index {
        self.chain[self.chain.len() - 1].as_ref()
    }

    fn record_usage(&self, index: &dyn Index) {
        if !self.options.statistics_enabled {
            return;
        }
        record_index_usage(
            self.options.stats.as_ref(),
            &IndexUsage {
                database: index.database_name(),
                index_name: index.name(),
                param_count: index.definition().param_count(),
                key_param_count: None,
            },
        );
    }

    /// Maps record ids found by the last hop to record ids of the base class.
    ///
    /// Returns a sorted, duplicate-free list.
    fn apply_tail_indexes(&self, last_result: &[Rid]) -> IndexResult<Vec<Rid>> {
        let hops = self.chain.len();
        let mut keys = prepare_keys(self.chain[hops - 2].definition(), last_result)?;

        for hop in (1..hops - 1).rev() {
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            self.options.interrupt.check()?;

            let current = self.chain[hop].as_ref();
            let rids = self.probe_hop(current, &keys)?;
            keys = prepare_keys(self.chain[hop - 1].definition(), &rids)?;
        }

        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.options.interrupt.check()?;

        let rids: BTreeSet<Rid> = self.probe_hop(self.base(), &keys)?.into_iter().collect();
        Ok(rids.into_iter().collect())
    }

    /// Probes one hop with a key set.
    ///
    /// Composite hops take one prefix range per key; simple hops take the
    /// whole set in one batch. Statistics are updated once per hop.
    fn probe_hop(&self, index: &dyn Index, keys: &BTreeSet<IndexKey>) -> IndexResult<Vec<Rid>> {
        let rids = if index.definition().is_composite() {
            let mut rids = Vec::new();
            for key in keys {
                rids.extend(collect_rids(index.entries_between(key, true, key, true, true)?)?);
            }
            rids
        } else {
            collect_rids(index.entries(keys, true)?)?
        };
        self.record_usage(index);
        Ok(rids)
    }

    /// Re-maps one last-hop entry through the tail of the chain
    fn resolve_entry(&self, entry: IndexResult<IndexEntry>) -> Vec<IndexResult<IndexEntry>> {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => return vec![Err(err)],
        };
        match self.apply_tail_indexes(&[entry.rid]) {
            Ok(rids) => rids
                .into_iter()
                .map(|rid| Ok(IndexEntry::new(entry.key.clone(), rid)))
                .collect(),
            Err(err) => vec![Err(err)],
        }
    }

    fn lazily_resolved<'a>(&'a self, stream: EntryStream<'a>) -> EntryStream<'a> {
        self.record_usage(self.last());
        Box::new(stream.flat_map(move |entry| self.resolve_entry(entry)))
    }

    fn reject(&self, operation: &'static str) -> IndexError {
        log_event(
            Event::ProxyMutationRejected,
            &[("index", &self.name), ("operation", operation)],
        );
        IndexError::unsupported(&self.name, operation)
    }
}

impl Index for ChainedIndexProxy {
    fn name(&self) -> &str {
        &self.name
    }

    fn database_name(&self) -> &str {
        self.base().database_name()
    }

    fn kind(&self) -> IndexKind {
        self.last().kind()
    }

    fn algorithm(&self) -> &str {
        self.last().algorithm()
    }

    fn definition(&self) -> &IndexDefinition {
        self.last().definition()
    }

    fn is_unique(&self) -> bool {
        self.base().is_unique()
    }

    fn has_range_query_support(&self) -> bool {
        self.last().has_range_query_support()
    }

    fn can_be_used_in_equality_operators(&self) -> bool {
        self.last().can_be_used_in_equality_operators()
    }

    fn supports_ordered_iterations(&self) -> bool {
        false
    }

    fn index_names(&self) -> Vec<String> {
        self.chain.iter().map(|index| index.name().to_string()).collect()
    }

    fn is_chained(&self) -> bool {
        true
    }

    /// Always a sorted, duplicate-free set of base records
    fn get(&self, key: &IndexKey) -> IndexResult<Vec<Rid>> {
        let last_result = self.last().get(key)?;
        self.record_usage(self.last());
        self.apply_tail_indexes(&last_result)
    }

    fn entries<'a>(&'a self, keys: &BTreeSet<IndexKey>, ascending: bool) -> IndexResult<EntryStream<'a>> {
        let stream = self.last().entries(keys, ascending)?;
        Ok(self.lazily_resolved(stream))
    }

    fn entries_between<'a>(
        &'a self,
        from: &IndexKey,
        from_inclusive: bool,
        to: &IndexKey,
        to_inclusive: bool,
        ascending: bool,
    ) -> IndexResult<EntryStream<'a>> {
        let stream = self
            .last()
            .entries_between(from, from_inclusive, to, to_inclusive, ascending)?;
        Ok(self.lazily_resolved(stream))
    }

    fn entries_major<'a>(&'a self, from: &IndexKey, inclusive: bool, ascending: bool) -> IndexResult<EntryStream<'a>> {
        let stream = self.last().entries_major(from, inclusive, ascending)?;
        Ok(self.lazily_resolved(stream))
    }

    fn entries_minor<'a>(&'a self, to: &IndexKey, inclusive: bool, ascending: bool) -> IndexResult<EntryStream<'a>> {
        let stream = self.last().entries_minor(to, inclusive, ascending)?;
        Ok(self.lazily_resolved(stream))
    }

    /// Distinct base records reachable through every key of the set
    fn get_values(&self, keys: &BTreeSet<IndexKey>) -> IndexResult<Vec<Rid>> {
        let last_result = collect_rids(self.last().entries(keys, true)?)?;
        self.record_usage(self.last());
        self.apply_tail_indexes(&last_result)
    }

    fn size(&self) -> IndexResult<u64> {
        self.last().size()
    }

    fn create(&self) -> IndexResult<()> {
        Err(self.reject("create"))
    }

    fn put(&self, _key: IndexKey, _rid: Rid) -> IndexResult<()> {
        Err(self.reject("put"))
    }

    fn remove(&self, _key: &IndexKey, _rid: Option<Rid>) -> IndexResult<bool> {
        Err(self.reject("remove"))
    }

    fn clear(&self) -> IndexResult<()> {
        Err(self.reject("clear"))
    }

    fn rebuild(&self) -> IndexResult<u64> {
        Err(self.reject("rebuild"))
    }

    fn flush(&self) -> IndexResult<()> {
        Err(self.reject("flush"))
    }

    fn delete(&self) -> IndexResult<()> {
        Err(self.reject("delete"))
    }
}

/// How well an index serves as a non-final hop; -1 means unusable.
///
/// Only tree or hash indexes that can return every record holding a link
/// qualify. Single-field beats composite, hash beats tree, and a composite
/// hop must keep null keys.
fn priority_of_usage(index: Option<&dyn Index>) -> i32 {
    let Some(index) = index else {
        return -1;
    };
    let composite = index.definition().is_composite();
    let mut priority = 1;

    if composite {
        if index.definition().is_null_values_ignored() {
            return -1;
        }
    } else {
        priority += 10;
    }

    match index.kind() {
        IndexKind::UniqueHash | IndexKind::NotUniqueHash => {
            if composite {
                return -1;
            }
            priority += 10;
        }
        IndexKind::Unique | IndexKind::NotUnique => priority += 5,
        IndexKind::Proxy | IndexKind::FullText | IndexKind::Dictionary | IndexKind::Spatial => return -1,
    }

    priority
}

/// Whether an index may be the base (or any non-final hop) of a chain
pub fn is_appropriate_as_base(index: &dyn Index) -> bool {
    priority_of_usage(Some(index)) > 0
}

/// Best non-final hop index; the first of equally good indexes wins
pub fn find_best_index(indexes: &[Arc<dyn Index>]) -> Option<Arc<dyn Index>> {
    let mut best: Option<&Arc<dyn Index>> = None;
    for index in indexes {
        if priority_of_usage(Some(index.as_ref())) > priority_of_usage(best.map(|b| b.as_ref())) {
            best = Some(index);
        }
    }
    best.cloned()
}

fn validate_chain(chain: &FieldChain, options: &ProxyOptions) -> PlanResult<()> {
    if !chain.is_long() {
        return Err(PlanningError::InvalidFieldChain {
            chain: chain.to_string(),
            reason: "single-hop chains use the plain index".to_string(),
        });
    }
    if chain.item_count() > options.max_chain_depth {
        return Err(PlanningError::ChainTooLong {
            chain: chain.to_string(),
            hops: chain.item_count(),
            limit: options.max_chain_depth,
        });
    }
    Ok(())
}

/// Owning class of every hop, starting with `class`.
///
/// Follows exactly `item_count - 1` links, so cyclic schemas terminate.
fn resolve_hop_classes(catalog: &dyn IndexCatalog, class: &str, chain: &FieldChain) -> PlanResult<Vec<String>> {
    if catalog.class(class).is_none() {
        return Err(PlanningError::ClassNotFound(class.to_string()));
    }

    let mut classes = Vec::with_capacity(chain.item_count());
    classes.push(class.to_string());
    for hop in 0..chain.item_count() - 1 {
        let owner = &classes[hop];
        let property_name = chain.item_name(hop);
        let property = catalog
            .property(owner, property_name)
            .ok_or_else(|| PlanningError::PropertyNotFound {
                class: owner.clone(),
                property: property_name.to_string(),
            })?;
        let linked = property
            .linked_class()
            .filter(|linked| catalog.class(linked).is_some())
            .ok_or_else(|| PlanningError::LinkedClassMissing {
                class: owner.clone(),
                property: property_name.to_string(),
            })?;
        classes.push(linked.to_string());
    }
    Ok(classes)
}

/// Checks that `from`'s property links to the class `to` is defined on
fn check_link(catalog: &dyn IndexCatalog, from: &dyn Index, to: &dyn Index) -> Result<(), String> {
    let owner = from.definition().class_name();
    let field = from
        .definition()
        .fields()
        .first()
        .ok_or_else(|| format!("index '{}' has no fields", from.name()))?;
    let linked = catalog
        .property(owner, field)
        .and_then(|property| property.linked_class())
        .ok_or_else(|| format!("{}.{} is not a link", owner, field))?;

    let target = to.definition().class_name();
    let mut visited = HashSet::new();
    let mut current = Some(linked);
    while let Some(class) = current {
        if class == target {
            return Ok(());
        }
        if !visited.insert(class) {
            break;
        }
        current = catalog.class(class).and_then(|c| c.superclass());
    }
    Err(format!(
        "{}.{} links to {}, but index '{}' is defined on {}",
        owner,
        field,
        linked,
        to.name(),
        target
    ))
}

fn best_hop_index(catalog: &dyn IndexCatalog, class: &str, field: &str) -> PlanResult<Arc<dyn Index>> {
    let involved = catalog.involved_indexes(class, &[field.to_string()]);
    find_best_index(&involved).ok_or_else(|| PlanningError::MissingIndex {
        class: class.to_string(),
        field: field.to_string(),
    })
}

/// Indexes on the last hop's property, one per kind.
///
/// Narrowest first; among equally narrow ones, range-capable kinds come
/// before the rest.
fn last_index_variants(catalog: &dyn IndexCatalog, class: &str, field: &str) -> Vec<Arc<dyn Index>> {
    let mut involved = catalog.involved_indexes(class, &[field.to_string()]);
    involved.sort_by_key(|index| (index.definition().param_count(), !index.kind().supports_range()));

    let mut kinds = HashSet::new();
    involved
        .into_iter()
        .filter(|index| kinds.insert(index.kind()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{KeyType, MemoryIndex};
    use crate::observability::MetricsRegistry;
    use crate::schema::{MemoryCatalog, PropertyDescriptor, PropertyType, SchemaClass};

    fn rid(cluster: i32, p: i64) -> Rid {
        Rid::new(cluster, p)
    }

    /// Student.group -> Group, Group.name indexed
    fn school() -> (MemoryCatalog, Arc<MemoryIndex>, Arc<MemoryIndex>) {
        let mut catalog = MemoryCatalog::new();
        catalog
            .add_class(SchemaClass::new("Group").with_property(PropertyDescriptor::new("name", PropertyType::String)))
            .unwrap();
        catalog
            .add_class(SchemaClass::new("Student").with_property(PropertyDescriptor::link("group", "Group")))
            .unwrap();

        let group_name = Arc::new(MemoryIndex::new(
            "Group.name",
            IndexKind::NotUnique,
            IndexDefinition::single("Group", "name", KeyType::String),
        ));
        let student_group = Arc::new(MemoryIndex::new(
            "Student.group",
            IndexKind::NotUnique,
            IndexDefinition::single("Student", "group", KeyType::Link),
        ));
        group_name.put(IndexKey::String("math".into()), rid(2, 0)).unwrap();
        group_name.put(IndexKey::String("art".into()), rid(2, 1)).unwrap();
        student_group.put(IndexKey::Link(rid(2, 0)), rid(1, 0)).unwrap();
        student_group.put(IndexKey::Link(rid(2, 0)), rid(1, 1)).unwrap();
        student_group.put(IndexKey::Link(rid(2, 1)), rid(1, 2)).unwrap();

        catalog.add_index(group_name.clone()).unwrap();
        catalog.add_index(student_group.clone()).unwrap();
        (catalog, group_name, student_group)
    }

    fn proxy(catalog: &MemoryCatalog, options: &ProxyOptions) -> Arc<dyn Index> {
        let chain = FieldChain::parse("group.name").unwrap();
        let mut proxies = ChainedIndexProxy::create_proxies(catalog, "Student", &chain, options).unwrap();
        assert_eq!(proxies.len(), 1);
        proxies.remove(0)
    }

    #[test]
    fn test_identity_delegation() {
        let (catalog, _, _) = school();
        let proxy = proxy(&catalog, &ProxyOptions::default());

        assert_eq!(proxy.name(), "IndexChain{Student.group, Group.name}");
        assert_eq!(proxy.index_names(), vec!["Student.group", "Group.name"]);
        assert_eq!(proxy.definition().class_name(), "Group");
        assert_eq!(proxy.definition().fields(), &["name".to_string()]);
        assert!(proxy.is_chained());
        assert!(!proxy.supports_ordered_iterations());
    }

    #[test]
    fn test_get_resolves_to_base_records() {
        let (catalog, _, _) = school();
        let proxy = proxy(&catalog, &ProxyOptions::default());

        let found = proxy.get(&IndexKey::String("math".into())).unwrap();
        assert_eq!(found, vec![rid(1, 0), rid(1, 1)]);
        assert!(proxy.get(&IndexKey::String("music".into())).unwrap().is_empty());
    }

    #[test]
    fn test_range_stream_is_remapped() {
        let (catalog, _, _) = school();
        let proxy = proxy(&catalog, &ProxyOptions::default());

        let all = collect_rids(proxy.entries_major(&IndexKey::String("a".into()), true, true).unwrap()).unwrap();
        // "art" first, then "math"
        assert_eq!(all, vec![rid(1, 2), rid(1, 0), rid(1, 1)]);
    }

    #[test]
    fn test_statistics_per_hop() {
        let (catalog, _, _) = school();
        let registry = Arc::new(MetricsRegistry::new());
        let options = ProxyOptions::default().with_stats(registry.clone());
        let proxy = proxy(&catalog, &options);

        proxy.get(&IndexKey::String("math".into())).unwrap();
        assert_eq!(registry.counter("index.Group.name.used"), 1);
        assert_eq!(registry.counter("index.Student.group.used"), 1);
        assert_eq!(registry.counter("db.default.query.indexUsed"), 2);
    }

    #[test]
    fn test_cancelled_between_hops() {
        let (catalog, _, _) = school();
        let interrupt = Interrupt::new();
        let proxy = proxy(&catalog, &ProxyOptions::default().with_interrupt(interrupt.clone()));

        interrupt.cancel();
        let err = proxy.get(&IndexKey::String("math".into())).unwrap_err();
        assert_eq!(err.code(), "CHAINPLAN_QUERY_CANCELLED");
    }

    #[test]
    fn test_single_hop_chain_rejected() {
        let (catalog, _, _) = school();
        let chain = FieldChain::parse("group").unwrap();
        let err = ChainedIndexProxy::create_proxies(&catalog, "Student", &chain, &ProxyOptions::default())
            .err()
            .unwrap();
        assert_eq!(err.code(), "CHAINPLAN_PLAN_INVALID_FIELD_CHAIN");
    }

    #[test]
    fn test_new_checks_links() {
        let (catalog, group_name, student_group) = school();
        let options = ProxyOptions::default();

        let linked: Vec<Arc<dyn Index>> = vec![student_group.clone(), group_name.clone()];
        let proxy = ChainedIndexProxy::new(&catalog, linked, options.clone()).unwrap();
        assert_eq!(proxy.name(), "IndexChain{Student.group, Group.name}");

        let reversed: Vec<Arc<dyn Index>> = vec![group_name, student_group];
        let err = ChainedIndexProxy::new(&catalog, reversed, options).err().unwrap();
        assert_eq!(err.code(), "CHAINPLAN_PLAN_INVALID_FIELD_CHAIN");
    }

    #[test]
    fn test_depth_limit() {
        let (catalog, _, _) = school();
        let chain = FieldChain::parse("group.name").unwrap();
        let options = ProxyOptions::default().with_max_chain_depth(1);
        let err = ChainedIndexProxy::create_proxies(&catalog, "Student", &chain, &options)
            .err()
            .unwrap();
        assert_eq!(err.code(), "CHAINPLAN_PLAN_CHAIN_TOO_LONG");
    }

    #[test]
    fn test_schema_errors() {
        let (catalog, _, _) = school();
        let options = ProxyOptions::default();

        let missing = FieldChain::parse("team.name").unwrap();
        let err = ChainedIndexProxy::create_proxies(&catalog, "Student", &missing, &options)
            .err()
            .unwrap();
        assert_eq!(err.code(), "CHAINPLAN_PLAN_PROPERTY_NOT_FOUND");

        let not_a_link = FieldChain::parse("name.x").unwrap();
        let err = ChainedIndexProxy::create_proxies(&catalog, "Group", &not_a_link, &options)
            .err()
            .unwrap();
        assert_eq!(err.code(), "CHAINPLAN_PLAN_LINKED_CLASS_MISSING");
    }

    #[test]
    fn test_for_field_chain_checks_base() {
        let (catalog, group_name, student_group) = school();
        let chain = FieldChain::parse("group.name").unwrap();
        let options = ProxyOptions::default();

        let proxies =
            ChainedIndexProxy::create_proxies_for_field_chain(student_group, &chain, &catalog, &options).unwrap();
        assert_eq!(proxies.len(), 1);

        let err = ChainedIndexProxy::create_proxies_for_field_chain(group_name, &chain, &catalog, &options)
            .err()
            .unwrap();
        assert_eq!(err.code(), "CHAINPLAN_PLAN_BASE_INDEX_MISMATCH");
    }

    #[test]
    fn test_base_priority() {
        let tree: Arc<dyn Index> = Arc::new(MemoryIndex::new(
            "tree",
            IndexKind::NotUnique,
            IndexDefinition::single("C", "f", KeyType::Link),
        ));
        let hash: Arc<dyn Index> = Arc::new(MemoryIndex::new(
            "hash",
            IndexKind::NotUniqueHash,
            IndexDefinition::single("C", "f", KeyType::Link),
        ));
        let dictionary: Arc<dyn Index> = Arc::new(MemoryIndex::new(
            "dict",
            IndexKind::Dictionary,
            IndexDefinition::single("C", "f", KeyType::Link),
        ));
        let composite_no_nulls: Arc<dyn Index> = Arc::new(MemoryIndex::new(
            "composite",
            IndexKind::NotUnique,
            IndexDefinition::composite("C", [("f", KeyType::Link), ("g", KeyType::String)])
                .with_null_values_ignored(true),
        ));

        assert!(!is_appropriate_as_base(dictionary.as_ref()));
        assert!(!is_appropriate_as_base(composite_no_nulls.as_ref()));
        assert!(is_appropriate_as_base(tree.as_ref()));

        let best = find_best_index(&[dictionary.clone(), tree.clone(), hash.clone()]).unwrap();
        assert_eq!(best.name(), "hash");
        assert!(find_best_index(&[dictionary, composite_no_nulls]).is_none());
    }

    #[test]
    fn test_mutations_rejected() {
        let (catalog, _, _) = school();
        let proxy = proxy(&catalog, &ProxyOptions::default());
        let err = proxy.put(IndexKey::String("x".into()), rid(1, 9)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code(), "CHAINPLAN_INDEX_UNSUPPORTED_OPERATION");
    }
}
