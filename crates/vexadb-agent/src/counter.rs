//! Per-collection in-flight row counters.
//!
//! The counters are the drain signal for schema-update quiescence: a
//! schema change only proceeds once the counter of its collection has
//! returned to zero.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Atomic in-flight row count of one collection.
#[derive(Default)]
pub struct CollectionCounter {
    active_count: AtomicU32,
}

impl CollectionCounter {
    pub fn add_active_count(&self, count: u32) {
        self.active_count.fetch_add(count, Ordering::AcqRel);
    }

    pub fn sub_active_count(&self, count: u32) {
        self.active_count.fetch_sub(count, Ordering::AcqRel);
    }

    pub fn dec_active_count(&self) {
        self.active_count.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn active_count(&self) -> u32 {
        self.active_count.load(Ordering::Acquire)
    }
}

/// name -> counter registry; the map locks, the counters do not.
#[derive(Default)]
pub struct CollectionCounterMap {
    counters: Mutex<HashMap<String, Arc<CollectionCounter>>>,
}

impl CollectionCounterMap {
    pub fn new() -> Self {
        CollectionCounterMap::default()
    }

    pub fn add_counter(&self, name: &str) {
        self.counters
            .lock()
            .insert(name.to_string(), Arc::new(CollectionCounter::default()));
    }

    pub fn remove_counter(&self, name: &str) {
        self.counters.lock().remove(name);
    }

    pub fn get_counter(&self, name: &str) -> Option<Arc<CollectionCounter>> {
        self.counters.lock().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_tracks_adds_and_subs() {
        let counter = CollectionCounter::default();
        counter.add_active_count(10);
        assert_eq!(counter.active_count(), 10);
        counter.sub_active_count(4);
        assert_eq!(counter.active_count(), 6);
        for _ in 0..6 {
            counter.dec_active_count();
        }
        assert_eq!(counter.active_count(), 0);
    }

    #[test]
    fn map_registers_and_removes() {
        let map = CollectionCounterMap::new();
        assert!(map.get_counter("c").is_none());
        map.add_counter("c");
        let counter = map.get_counter("c").unwrap();
        counter.add_active_count(1);
        // the registry hands out the same counter
        assert_eq!(map.get_counter("c").unwrap().active_count(), 1);
        map.remove_counter("c");
        assert!(map.get_counter("c").is_none());
    }

    #[test]
    fn counter_is_shared_across_threads() {
        let map = Arc::new(CollectionCounterMap::new());
        map.add_counter("c");
        let counter = map.get_counter("c").unwrap();
        counter.add_active_count(64);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = map.get_counter("c").unwrap();
                std::thread::spawn(move || {
                    for _ in 0..8 {
                        counter.dec_active_count();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.active_count(), 0);
    }
}
