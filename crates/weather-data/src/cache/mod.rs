//! Last-known-good response cache.
//!
//! Holds the most recent successful report per query key so that a terminal
//! failure can be answered with stale data instead of an error. Entries are
//! overwritten on every success and never evicted; the cache is in-memory
//! and lives for the process lifetime.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

use crate::models::{QueryKey, WeatherReport};

/// Storage for last-known-good reports, consulted on terminal failure.
///
/// Implementations are injected into the fetch service rather than reached
/// through a shared static, so their lifetime is explicit: app-scoped when
/// shared across services, request-scoped when constructed per scope.
pub trait ResponseCache: Send + Sync {
    /// The last successful report stored under `key`, if any.
    fn get(&self, key: &str) -> Option<WeatherReport>;

    /// Store `report` under `key`, unconditionally overwriting.
    fn put(&self, key: &str, report: WeatherReport);
}

/// In-memory [`ResponseCache`] backed by a `Mutex<HashMap>`.
///
/// Last-write-wins, no TTL, no capacity bound. Writes happen one per
/// successful fetch, so contention is negligible.
pub struct InMemoryResponseCache {
    entries: Mutex<HashMap<QueryKey, WeatherReport>>,
}

impl InMemoryResponseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the entries mutex, recovering from poison if necessary.
    ///
    /// Recovering is safe here: the worst case is a stale or missing cache
    /// entry, which is better than panicking.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<QueryKey, WeatherReport>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Response cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn get(&self, key: &str) -> Option<WeatherReport> {
        self.lock_entries().get(key).cloned()
    }

    fn put(&self, key: &str, report: WeatherReport) {
        debug!("Caching report for '{}'", key);
        self.lock_entries().insert(key.to_string(), report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_for(city: &str, temperature: f64) -> WeatherReport {
        WeatherReport {
            city_name: city.to_string(),
            temperature,
            humidity: 55,
            icon: "01d".to_string(),
        }
    }

    #[test]
    fn test_cache_put_get() {
        let cache = InMemoryResponseCache::new();
        cache.put("Paris", report_for("Paris", 21.0));

        let cached = cache.get("Paris");
        assert!(cached.is_some());
        assert_eq!(cached.unwrap().city_name, "Paris");
    }

    #[test]
    fn test_cache_miss() {
        let cache = InMemoryResponseCache::new();
        assert!(cache.get("Nowhere").is_none());
    }

    #[test]
    fn test_put_overwrites_previous_entry() {
        let cache = InMemoryResponseCache::new();
        cache.put("Paris", report_for("Paris", 21.0));
        cache.put("Paris", report_for("Paris", 4.5));

        let cached = cache.get("Paris").unwrap();
        assert_eq!(cached.temperature, 4.5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let cache = InMemoryResponseCache::new();
        cache.put("Paris", report_for("Paris", 21.0));
        cache.put("London", report_for("London", 14.0));

        assert_eq!(cache.get("Paris").unwrap().temperature, 21.0);
        assert_eq!(cache.get("London").unwrap().temperature, 14.0);
        assert_eq!(cache.len(), 2);
    }
}
