use crate::metrics_defs::{MR_CACHE_HIT, MR_CACHE_MISS};
use crate::types::{MergeRequest, QueryParams, param_value};
use metrics::counter;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Derives the canonical cache key for one per-assignee query.
///
/// Parameter pairs are sorted by name, so two maps holding the same entries
/// produce the same key whatever their iteration order. The endpoint root is
/// normalized by trimming trailing slashes.
pub fn cache_key(api_url: &str, assignee: &str, params: &QueryParams) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("{name}={}", param_value(value)))
        .collect();
    pairs.sort();
    format!(
        "{}|{}|{}",
        api_url.trim_end_matches('/'),
        assignee,
        pairs.join("&")
    )
}

struct CacheEntry {
    fetched_at: Instant,
    merge_requests: Vec<MergeRequest>,
}

/// In-process TTL cache for per-assignee merge request pages.
///
/// Entries are superseded in place on refetch and never purged; a stale entry
/// simply stops satisfying lookups. Memory is bounded by the small universe
/// of (endpoint, assignee, query-shape) combinations.
#[derive(Default)]
pub struct MrCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MrCache {
    /// Returns the cached result set only if its age is within `ttl`.
    pub fn lookup(&self, key: &str, ttl: Duration) -> Option<Vec<MergeRequest>> {
        let entries = self.entries.read();
        let fresh = entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() <= ttl)
            .map(|entry| entry.merge_requests.clone());

        let metric = if fresh.is_some() {
            MR_CACHE_HIT
        } else {
            MR_CACHE_MISS
        };
        counter!(metric).increment(1);
        fresh
    }

    /// Unconditionally overwrites any entry for `key` with a fresh timestamp.
    pub fn store(&self, key: &str, merge_requests: Vec<MergeRequest>) {
        self.entries.write().insert(
            key.to_string(),
            CacheEntry {
                fetched_at: Instant::now(),
                merge_requests,
            },
        );
    }
}
