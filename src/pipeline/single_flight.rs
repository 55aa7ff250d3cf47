use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Admits at most one holder per key at a time
pub struct SingleFlight<K> {
    in_flight: Arc<Mutex<HashSet<K>>>,
}

impl<K> Default for SingleFlight<K> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> SingleFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if `key` is already held. The key is released when the
    /// returned guard drops.
    pub fn try_acquire(&self, key: &K) -> Option<FlightGuard<K>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(key.clone()) {
            return None;
        }
        Some(FlightGuard {
            key: key.clone(),
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

pub struct FlightGuard<K: Eq + Hash> {
    key: K,
    in_flight: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash> Drop for FlightGuard<K> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let flights = SingleFlight::new();
        let guard = flights.try_acquire(&"abc123");
        assert!(guard.is_some());
        assert!(flights.try_acquire(&"abc123").is_none());
        assert!(flights.try_acquire(&"other").is_some());
    }

    #[test]
    fn test_drop_releases_key() {
        let flights = SingleFlight::new();
        {
            let _guard = flights.try_acquire(&1);
            assert!(flights.is_in_flight(&1));
        }
        assert!(!flights.is_in_flight(&1));
        assert!(flights.try_acquire(&1).is_some());
    }
}
