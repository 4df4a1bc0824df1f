//! In-memory key/value tables whose entries expire on their own.
//!
//! Each table is owned by [`Caches`] and constructed once at startup.
//! Expiry is enforced on read, so a stale entry is a miss even if the
//! janitor has not swept yet.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use time::OffsetDateTime;

use crate::infrastructure::upstream::MediaLink;

struct CacheEntry<V> {
    value: V,
    expires_at: OffsetDateTime,
}

pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live value for `key`. An entry at or past its expiry is
    /// removed and reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > OffsetDateTime::now_utc() => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: K, value: V, ttl: Duration) {
        self.put_until(key, value, OffsetDateTime::now_utc() + ttl);
    }

    /// Inserts with an absolute expiry, for values whose lifetime is decided
    /// elsewhere (e.g. a signed URL that embeds its own deadline).
    pub fn put_until(&self, key: K, value: V, expires_at: OffsetDateTime) {
        self.entries
            .lock()
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Removes one entry; returns whether it was present.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Removes every entry; returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Drops all entries expired as of `now`; returns how many were dropped.
    pub fn sweep(&self, now: OffsetDateTime) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Keys of all unexpired entries, for the admin view.
    pub fn keys(&self) -> Vec<K> {
        let now = OffsetDateTime::now_utc();
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// The four memoization tables the service runs on.
pub struct Caches {
    /// media id -> resolved upstream location (or the unavailable marker)
    pub media_links: TtlCache<String, MediaLink>,
    /// "{channel}/{kind}" -> rendered feed document
    pub channel_feeds: TtlCache<String, String>,
    /// "{playlist}/{kind}" -> rendered feed document
    pub playlist_feeds: TtlCache<String, String>,
    /// channel name -> canonical channel id
    pub channel_names: TtlCache<String, String>,
}

impl Caches {
    pub fn new() -> Self {
        Self {
            media_links: TtlCache::new(),
            channel_feeds: TtlCache::new(),
            playlist_feeds: TtlCache::new(),
            channel_names: TtlCache::new(),
        }
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}
