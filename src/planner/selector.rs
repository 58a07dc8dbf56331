//! Index selection
//!
//! Turns ranked search candidates into a concrete index handle and the key
//! parameters to probe it with. Multi-hop candidates are answered by
//! chained proxies; everything else by the narrowest plain index whose
//! leading fields match the candidate.

use std::sync::Arc;

use serde_json::Value;

use crate::config::PlannerConfig;
use crate::index::Index;
use crate::observability::{log_event, Event};
use crate::schema::IndexCatalog;

use super::candidate::SearchCandidate;
use super::chain::{ChainedIndexProxy, ProxyOptions};

/// An index chosen for one candidate
#[derive(Debug, Clone)]
pub struct SelectedIndex {
    pub index: Arc<dyn Index>,
    pub candidate: SearchCandidate,
    /// One value per leading index field; the last one belongs to the
    /// candidate's operator
    pub key_params: Vec<Value>,
}

pub struct IndexSelector<'a> {
    catalog: &'a dyn IndexCatalog,
    use_chained_indexes: bool,
    prefer_narrow_indexes: bool,
    options: ProxyOptions,
}

impl<'a> IndexSelector<'a> {
    pub fn new(catalog: &'a dyn IndexCatalog, config: &PlannerConfig, options: ProxyOptions) -> Self {
        Self {
            catalog,
            use_chained_indexes: config.use_chained_indexes,
            prefer_narrow_indexes: config.prefer_narrow_indexes,
            options,
        }
    }

    /// First candidate, in ranked order, that some index can serve
    pub fn select(&self, class: &str, candidates: &[SearchCandidate]) -> Option<SelectedIndex> {
        candidates
            .iter()
            .find_map(|candidate| self.select_for_candidate(class, candidate))
    }

    /// Best index for a single candidate
    pub fn select_for_candidate(&self, class: &str, candidate: &SearchCandidate) -> Option<SelectedIndex> {
        let field_count = candidate.field_count();
        let bound = candidate.field_value_pairs.len();

        for index in self.usable_indexes(class, candidate) {
            let definition = index.definition();
            if candidate.contains_null_values && definition.is_null_values_ignored() {
                continue;
            }
            // a range probe must land on the column right after the bound ones
            if !candidate.last_operator.is_equality()
                && definition.fields().get(bound).map(String::as_str) != Some(candidate.last_field.last())
            {
                continue;
            }
            if definition.param_count() < field_count {
                continue;
            }

            let key_params: Vec<Value> = definition.fields()[..field_count]
                .iter()
                .map(|field| {
                    candidate
                        .field_value_pairs
                        .get(field)
                        .cloned()
                        .unwrap_or_else(|| candidate.last_value.clone())
                })
                .collect();

            if !candidate.last_operator.supports_index(index.as_ref(), key_params.len()) {
                continue;
            }

            log_event(
                Event::IndexSelected,
                &[
                    ("class", class),
                    ("index", index.name()),
                    ("chained", if index.is_chained() { "true" } else { "false" }),
                    ("operator", candidate.last_operator.symbol()),
                ],
            );
            return Some(SelectedIndex {
                index,
                candidate: candidate.clone(),
                key_params,
            });
        }
        None
    }

    fn usable_indexes(&self, class: &str, candidate: &SearchCandidate) -> Vec<Arc<dyn Index>> {
        if candidate.last_field.is_long() {
            if !self.use_chained_indexes {
                return Vec::new();
            }
            return match ChainedIndexProxy::create_proxies(self.catalog, class, &candidate.last_field, &self.options) {
                Ok(proxies) => proxies,
                Err(err) => {
                    log_event(
                        Event::IndexChainRejected,
                        &[
                            ("class", class),
                            ("field", &candidate.last_field.to_string()),
                            ("code", err.code()),
                            ("reason", &err.to_string()),
                        ],
                    );
                    Vec::new()
                }
            };
        }

        let mut indexes = self.catalog.involved_indexes(class, &candidate.fields());
        if self.prefer_narrow_indexes {
            indexes.sort_by_key(|index| index.definition().param_count());
        }
        indexes
    }
}
