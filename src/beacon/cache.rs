//! A bounded, epoch-keyed memoization cache: the Rust shape of the
//! `@lru_cache(maxsize=N)` annotations the Python original put directly on
//! `Beacon.get_proposer_duties` / `Beacon.get_duty_slot_to_committee_index_to_validators_index`.
//! Eviction is oldest-epoch-first (lowest epoch number), which is exactly
//! right here because the duty engine only ever queries epochs in
//! non-decreasing order.

use crate::types::Epoch;
use std::collections::HashMap;

pub struct EpochCache<V> {
    capacity: usize,
    entries: HashMap<Epoch, V>,
}

impl<V> EpochCache<V> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        EpochCache {
            capacity,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, epoch: Epoch) -> Option<&V> {
        self.entries.get(&epoch)
    }

    pub fn insert(&mut self, epoch: Epoch, value: V) {
        self.entries.insert(epoch, value);

        while self.entries.len() > self.capacity {
            if let Some(&oldest) = self.entries.keys().min() {
                self.entries.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_epoch_first() {
        let mut cache: EpochCache<u32> = EpochCache::new(2);
        cache.insert(Epoch::new(1), 100);
        cache.insert(Epoch::new(2), 200);
        cache.insert(Epoch::new(3), 300);

        assert!(cache.get(Epoch::new(1)).is_none());
        assert_eq!(cache.get(Epoch::new(2)), Some(&200));
        assert_eq!(cache.get(Epoch::new(3)), Some(&300));
    }

    #[test]
    fn updating_an_existing_epoch_does_not_evict() {
        let mut cache: EpochCache<u32> = EpochCache::new(2);
        cache.insert(Epoch::new(1), 100);
        cache.insert(Epoch::new(2), 200);
        cache.insert(Epoch::new(2), 201);

        assert_eq!(cache.get(Epoch::new(1)), Some(&100));
        assert_eq!(cache.get(Epoch::new(2)), Some(&201));
    }
}
