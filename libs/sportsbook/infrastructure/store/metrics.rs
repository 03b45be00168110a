//! Store diagnostics counters
//!
//! Lock-free so stats can be read while the writer holds the store lock.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct StoreMetrics {
    dumps_applied: AtomicU64,
    entities_loaded: AtomicU64,
    deltas_applied: AtomicU64,
    deltas_unchanged: AtomicU64,
    orphan_deltas: AtomicU64,
    unknown_deltas: AtomicU64,
    stale_discarded: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dump(&self, entities: usize) {
        self.dumps_applied.fetch_add(1, Ordering::Relaxed);
        self.entities_loaded
            .fetch_add(entities as u64, Ordering::Relaxed);
    }

    pub fn record_entities(&self, entities: usize) {
        self.entities_loaded
            .fetch_add(entities as u64, Ordering::Relaxed);
    }

    pub fn increment_applied(&self) {
        self.deltas_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unchanged(&self) {
        self.deltas_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_orphans(&self) {
        self.orphan_deltas.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unknown(&self) {
        self.unknown_deltas.fetch_add(1, Ordering::Relaxed);
    }

    /// Content from a superseded or stopped subscription was dropped
    pub fn increment_stale(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn orphan_deltas(&self) -> u64 {
        self.orphan_deltas.load(Ordering::Relaxed)
    }

    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StoreStats {
        StoreStats {
            dumps_applied: self.dumps_applied.load(Ordering::Relaxed),
            entities_loaded: self.entities_loaded.load(Ordering::Relaxed),
            deltas_applied: self.deltas_applied.load(Ordering::Relaxed),
            deltas_unchanged: self.deltas_unchanged.load(Ordering::Relaxed),
            orphan_deltas: self.orphan_deltas.load(Ordering::Relaxed),
            unknown_deltas: self.unknown_deltas.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub dumps_applied: u64,
    pub entities_loaded: u64,
    pub deltas_applied: u64,
    pub deltas_unchanged: u64,
    pub orphan_deltas: u64,
    pub unknown_deltas: u64,
    pub stale_discarded: u64,
}
