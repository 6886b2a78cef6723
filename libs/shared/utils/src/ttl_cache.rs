use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// In-process key-value store with per-entry expiry.
///
/// Expiry is checked on every access; stale entries are dropped on read and
/// swept on insert, so the map never outgrows the set of live keys.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store a value, replacing any previous entry under the same key.
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Utc::now());
    }

    /// Remove and return the value if present and not expired.
    pub fn take(&self, key: &K) -> Option<V> {
        self.take_at(key, Utc::now())
    }

    /// Run `f` against the live entry under `key`, if any.
    pub fn update<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.update_at(key, f, Utc::now())
    }

    fn insert_at(&self, key: K, value: V, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().expect("ttl cache poisoned");
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    fn take_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.entries.lock().expect("ttl cache poisoned");
        let entry = entries.remove(key)?;
        if entry.expires_at <= now {
            return None;
        }
        Some(entry.value)
    }

    fn update_at<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R, now: DateTime<Utc>) -> Option<R> {
        let mut entries = self.entries.lock().expect("ttl cache poisoned");
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => Some(f(&mut entry.value)),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}
