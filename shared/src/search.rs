use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::debug;

use crate::capabilities::PlaceSuggestion;
use crate::GEOCODE_CACHE_CAPACITY;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchStep {
    /// Query too short; suggestions were cleared.
    Cleared,
    /// Answered from cache.
    Cached,
    /// Ask the geocoder for this normalized query.
    Lookup(String),
}

#[must_use]
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Address search with an LRU of recent geocoder answers.
///
/// Only the latest query's results are shown; answers for older queries
/// still populate the cache.
#[derive(Debug)]
pub struct PlaceSearch {
    cache: LruCache<String, Vec<PlaceSuggestion>>,
    min_query_len: usize,
    current_query: Option<String>,
    suggestions: Vec<PlaceSuggestion>,
    loading: bool,
}

impl Default for PlaceSearch {
    fn default() -> Self {
        Self::new(GEOCODE_CACHE_CAPACITY, crate::MIN_GEOCODE_QUERY_LEN)
    }
}

impl PlaceSearch {
    #[must_use]
    pub fn new(capacity: usize, min_query_len: usize) -> Self {
        Self {
            cache: LruCache::new(Self::capacity(capacity)),
            min_query_len,
            current_query: None,
            suggestions: Vec::new(),
            loading: false,
        }
    }

    fn capacity(capacity: usize) -> NonZeroUsize {
        NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn resize(&mut self, capacity: usize, min_query_len: usize) {
        self.cache.resize(Self::capacity(capacity));
        self.min_query_len = min_query_len;
    }

    #[must_use]
    pub fn suggestions(&self) -> &[PlaceSuggestion] {
        &self.suggestions
    }

    #[must_use]
    pub fn current_query(&self) -> Option<&str> {
        self.current_query.as_deref()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn search(&mut self, raw: &str) -> SearchStep {
        let query = normalize_query(raw);
        if query.chars().count() < self.min_query_len {
            self.clear();
            return SearchStep::Cleared;
        }

        if let Some(hit) = self.cache.get(&query) {
            self.suggestions = hit.clone();
            self.current_query = Some(query);
            self.loading = false;
            return SearchStep::Cached;
        }

        self.current_query = Some(query.clone());
        self.loading = true;
        SearchStep::Lookup(query)
    }

    /// Returns whether the results were for the current query.
    pub fn receive(&mut self, query: &str, results: Vec<PlaceSuggestion>) -> bool {
        let current = self.current_query.as_deref() == Some(query);
        if current {
            self.suggestions.clone_from(&results);
            self.loading = false;
        } else {
            debug!(query, "discarding geocode results for stale query");
        }
        self.cache.put(query.to_string(), results);
        current
    }

    /// Picks a suggestion and closes the list.
    pub fn select(&mut self, index: usize) -> Option<PlaceSuggestion> {
        let picked = self.suggestions.get(index).cloned()?;
        self.clear();
        Some(picked)
    }

    pub fn clear(&mut self) {
        self.current_query = None;
        self.suggestions.clear();
        self.loading = false;
    }

    #[must_use]
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }
}
