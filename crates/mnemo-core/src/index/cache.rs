//! Bounded in-process cache of canonical memory records.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;
use mnemo_types::memory::MemoryRecord;
use uuid::Uuid;

/// Default capacity for the record cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Bounded `id -> MemoryRecord` cache shared by concurrent index, search,
/// and delete calls.
///
/// Insertion-order (FIFO) eviction keeps the map at or below capacity.
/// `evict` is synchronous so `delete` can clear an entry before returning,
/// avoiding stale reads. Backend mutations made out-of-band are invisible
/// here until the affected ids are evicted or overwritten.
pub struct RecordCache {
    capacity: usize,
    records: DashMap<Uuid, MemoryRecord>,
    order: Mutex<VecDeque<Uuid>>,
}

impl RecordCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MemoryRecord> {
        self.records.get(id).map(|entry| entry.clone())
    }

    pub fn insert(&self, record: MemoryRecord) {
        let id = record.id;
        let replaced = self.records.insert(id, record).is_some();
        if replaced {
            return;
        }

        // A poisoned order lock degrades to an unbounded map; entries stay
        // readable and evict() still works.
        let Ok(mut order) = self.order.lock() else {
            return;
        };
        order.push_back(id);
        while self.records.len() > self.capacity {
            // Skip ids already removed via evict().
            match order.pop_front() {
                Some(oldest) => {
                    self.records.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Remove an entry immediately. The stale order slot is skipped later.
    pub fn evict(&self, id: &Uuid) {
        self.records.remove(id);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
