//! Temporal caching of static environment elements with LRU eviction.
//!
//! The byte budget follows memory pressure. Every mutating call leaves the
//! tracked size at or below the active budget.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use tessera_core::{ContentImportance, ElementId, MemoryBudget, MemoryPressure};

/// Environment data worth keeping between frames
#[derive(Debug, Clone)]
pub struct EnvironmentElement {
    pub id: ElementId,
    /// Only static elements are cached
    pub is_static: bool,
    pub importance: ContentImportance,
    pub payload: Arc<[u8]>,
    pub last_accessed: Instant,
}

impl EnvironmentElement {
    /// Create an element, stamped as accessed now
    pub fn new(id: ElementId, is_static: bool, importance: ContentImportance, payload: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id,
            is_static,
            importance,
            payload: payload.into(),
            last_accessed: Instant::now(),
        }
    }

    /// Bytes charged against the cache budget
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Cache performance statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub inserts: u64,
    /// Elements larger than the whole budget
    pub rejected: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 before any lookup
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry {
    element: EnvironmentElement,
    sequence: u64,
}

/// LRU cache of static environment elements
pub struct TemporalCache {
    entries: AHashMap<ElementId, CacheEntry>,
    /// Access order, oldest first
    recency: BTreeMap<u64, ElementId>,
    next_sequence: u64,
    size_bytes: usize,
    budget: MemoryBudget,
    stale_after: Duration,
    enabled: bool,
    stats: CacheStats,
}

impl TemporalCache {
    /// Create an empty cache at the `Low` pressure budget
    pub fn new(stale_after: Duration) -> Self {
        Self::with_budget(MemoryBudget::default(), stale_after)
    }

    /// Create an empty cache with an explicit budget
    pub fn with_budget(budget: MemoryBudget, stale_after: Duration) -> Self {
        Self {
            entries: AHashMap::new(),
            recency: BTreeMap::new(),
            next_sequence: 0,
            size_bytes: 0,
            budget,
            stale_after,
            enabled: true,
            stats: CacheStats::default(),
        }
    }

    /// Tracked bytes
    pub fn size(&self) -> usize {
        self.size_bytes
    }

    /// Number of cached elements
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active budget
    pub fn budget(&self) -> MemoryBudget {
        self.budget
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `id` is cached, without touching its recency
    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Insert the static elements of `elements`, returning how many were stored.
    ///
    /// An insert that would overflow the budget first evicts least recently
    /// used entries down to half the budget.
    pub fn cache_static_elements<I>(&mut self, elements: I) -> usize
    where
        I: IntoIterator<Item = EnvironmentElement>,
    {
        // A zero budget holds nothing, not even empty payloads
        if !self.enabled || self.budget.is_zero() {
            return 0;
        }

        let mut inserted = 0;
        for mut element in elements.into_iter().filter(|e| e.is_static) {
            let size = element.size();
            if !self.budget.fits(size) {
                log::debug!("Rejecting element {} ({} bytes exceeds budget)", element.id, size);
                self.stats.rejected += 1;
                continue;
            }

            self.remove(element.id);

            if self.size_bytes + size > self.budget.max_bytes {
                self.evict_to(self.budget.eviction_target());
                // The target may still leave too little room for a large element
                if self.size_bytes + size > self.budget.max_bytes {
                    self.evict_to(self.budget.max_bytes - size);
                }
            }

            element.last_accessed = Instant::now();
            let sequence = self.bump_sequence();
            self.recency.insert(sequence, element.id);
            self.entries.insert(element.id, CacheEntry { element, sequence });
            self.size_bytes += size;
            self.stats.inserts += 1;
            inserted += 1;
        }
        inserted
    }

    /// Look up an element and mark it most recently used
    pub fn get_cached_element(&mut self, id: ElementId) -> Option<EnvironmentElement> {
        let sequence = self.bump_sequence();
        let Some(entry) = self.entries.get_mut(&id) else {
            self.stats.misses += 1;
            return None;
        };

        self.recency.remove(&entry.sequence);
        self.recency.insert(sequence, id);
        entry.sequence = sequence;
        entry.element.last_accessed = Instant::now();
        self.stats.hits += 1;
        Some(entry.element.clone())
    }

    /// Move to the budget for `pressure`; `Critical` empties the cache
    pub fn adjust_cache_size(&mut self, pressure: MemoryPressure) {
        self.set_budget(MemoryBudget::for_pressure(pressure));
    }

    /// Apply a budget, evicting down to half of it if the cache no longer fits
    pub fn set_budget(&mut self, budget: MemoryBudget) {
        if budget != self.budget {
            log::debug!("Cache budget {} -> {} bytes", self.budget.max_bytes, budget.max_bytes);
        }
        self.budget = budget;

        if budget.is_zero() {
            self.clear();
        } else if self.size_bytes > budget.max_bytes {
            self.evict_to(budget.eviction_target());
        }
    }

    /// Drop entries not accessed within the staleness window
    pub fn cleanup_unused_elements(&mut self) -> usize {
        self.cleanup_unused_elements_at(Instant::now())
    }

    /// Staleness sweep measured against `now`
    pub fn cleanup_unused_elements_at(&mut self, now: Instant) -> usize {
        let stale: Vec<ElementId> = self
            .entries
            .values()
            .filter(|entry| now.saturating_duration_since(entry.element.last_accessed) > self.stale_after)
            .map(|entry| entry.element.id)
            .collect();

        for id in &stale {
            self.remove(*id);
        }
        if !stale.is_empty() {
            log::debug!("Swept {} stale cache element(s)", stale.len());
        }
        stale.len()
    }

    /// Remove every entry, counting each as an eviction
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.recency.clear();
        self.size_bytes = 0;
        self.stats.evictions += count as u64;
        if count > 0 {
            log::debug!("Cleared {} cached element(s)", count);
        }
    }

    /// Empty the cache and refuse further inserts
    pub fn disable(&mut self) {
        self.clear();
        self.enabled = false;
    }

    fn bump_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    fn remove(&mut self, id: ElementId) -> Option<EnvironmentElement> {
        let entry = self.entries.remove(&id)?;
        self.recency.remove(&entry.sequence);
        self.size_bytes -= entry.element.size();
        Some(entry.element)
    }

    /// Evict least recently used entries until at most `target` bytes remain
    fn evict_to(&mut self, target: usize) {
        let mut evicted = 0u64;
        while self.size_bytes > target {
            let Some((_, id)) = self.recency.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&id) {
                self.size_bytes -= entry.element.size();
                evicted += 1;
            }
        }

        if evicted > 0 {
            self.stats.evictions += evicted;
            log::debug!("Evicted {} element(s), {} bytes remain", evicted, self.size_bytes);
        }
    }
}

impl std::fmt::Debug for TemporalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalCache")
            .field("len", &self.entries.len())
            .field("size_bytes", &self.size_bytes)
            .field("budget", &self.budget)
            .field("enabled", &self.enabled)
            .field("stats", &self.stats)
            .finish()
    }
}
