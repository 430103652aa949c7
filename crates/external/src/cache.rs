//! Process-local TTL cache.
//!
//! Entries live for a fixed time-to-live from insertion. Expired entries are
//! dropped when a read finds them; there is no background sweep. Time comes
//! from a [`Clock`] so tests can move it forward by hand.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }
}

struct Entry<V> {
    inserted_at: Instant,
    value: V,
}

/// A map whose entries expire after a fixed TTL.
pub struct TtlCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a live entry, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        // Another writer may have refreshed the entry in between.
        if let Some(entry) = entries.get(key) {
            if now.duration_since(entry.inserted_at) < self.ttl {
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Stores a value, replacing any previous entry for the key.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let entry = Entry {
            inserted_at: self.clock.now(),
            value,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Number of stored entries, expired ones included until read.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Builds a cache key from request parameters.
///
/// Parameters are sorted by name; values are trimmed and lowercased; empty
/// values are dropped. Two requests differing only in parameter order,
/// letter case or surrounding whitespace share a key.
pub fn cache_key(prefix: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut parts: Vec<(&str, String)> = params
        .iter()
        .filter_map(|&(name, value)| {
            let value = value?.trim().to_lowercase();
            (!value.is_empty()).then_some((name, value))
        })
        .collect();
    parts.sort();

    let query = parts
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", prefix, query)
}
