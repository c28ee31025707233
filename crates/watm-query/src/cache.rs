//! Two-tier query cache.
//!
//! The default tier holds one all-scenario snapshot per variable and is
//! only emptied by [`QueryCache::clear`]. The general tier maps canonical
//! request keys to snapshots and evicts in insertion order once it holds
//! `max_size` entries. Both tiers and the FIFO queue sit behind a single
//! mutex; callers compute outside the lock and insert afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;
use watm_core::SeriesFrame;

use crate::key::CacheKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub general_size: usize,
    pub default_size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct CacheState {
    defaults: HashMap<String, Arc<SeriesFrame>>,
    entries: HashMap<CacheKey, Arc<SeriesFrame>>,
    order: VecDeque<CacheKey>,
}

pub struct QueryCache {
    max_size: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// `max_size` bounds the general tier; 0 disables it.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// General-tier lookup. Reads never change eviction order.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<SeriesFrame>> {
        let found = self.state.lock().entries.get(key).cloned();
        self.record(found.is_some(), "general");
        found
    }

    /// Inserts into the general tier, evicting the oldest entries beyond
    /// `max_size`. Replacing an existing key keeps its queue position.
    pub fn insert(&self, key: CacheKey, frame: Arc<SeriesFrame>) {
        if self.max_size == 0 {
            return;
        }
        let mut state = self.state.lock();
        if state.entries.insert(key.clone(), frame).is_none() {
            state.order.push_back(key);
        }
        while state.order.len() > self.max_size {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                debug!(key = %oldest, "evicted cache entry");
            }
        }
    }

    pub fn default_snapshot(&self, variable: &str) -> Option<Arc<SeriesFrame>> {
        let found = self.state.lock().defaults.get(variable).cloned();
        self.record(found.is_some(), "default");
        found
    }

    pub fn has_default(&self, variable: &str) -> bool {
        self.state.lock().defaults.contains_key(variable)
    }

    pub fn insert_default(&self, variable: impl Into<String>, frame: Arc<SeriesFrame>) {
        self.state.lock().defaults.insert(variable.into(), frame);
    }

    /// Empties both tiers in one critical section.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.defaults.clear();
        state.entries.clear();
        state.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            general_size: state.entries.len(),
            default_size: state.defaults.len(),
            max_size: self.max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn record(&self, hit: bool, tier: &'static str) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(tier, "cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(tier, "cache miss");
        }
    }
}
