//! Stats sink for the read loop.
//!
//! The client reports two things: event-local failures (an event that raised
//! during decode or callback) and every TABLE_MAP it installs. Callers plug
//! their own sink in; [`CountingStats`] is a ready-made atomic counter pair.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sink for read-loop statistics.
pub trait ReplicaStats: Send + Sync {
    /// An event raised during decoding or callback dispatch.
    fn tick_error(&self);

    /// A TABLE_MAP event bound `table_id` to `(db, table)`.
    fn process_table_map(&self, table_id: u64, db: &str, table: &str);
}

/// Counting sink backed by atomics.
#[derive(Debug, Default)]
pub struct CountingStats {
    errors: AtomicU64,
    table_maps: AtomicU64,
}

impl CountingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn table_maps(&self) -> u64 {
        self.table_maps.load(Ordering::Relaxed)
    }
}

impl ReplicaStats for CountingStats {
    fn tick_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn process_table_map(&self, _table_id: u64, _db: &str, _table: &str) {
        self.table_maps.fetch_add(1, Ordering::Relaxed);
    }
}
