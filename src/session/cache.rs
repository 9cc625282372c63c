//! Bounded memo of recent token verification outcomes.
//!
//! Keys are raw cookie values, entries hold the boolean outcome of a full
//! verification. Each entry expires a fixed interval after insertion (not
//! sliding) and the least-recently-used entry is evicted once the capacity
//! is exceeded. The cache memoizes outcomes, not identities: a rotated
//! secret or a shrunk TTL does not retroactively flip cached entries. They
//! have to age out, or be dropped with [`VerificationCache::clear`].

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_CAPACITY: usize = 128;
const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

pub struct VerificationCache {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    // Monotonic access counter; higher means more recently used.
    clock: u64,
}

struct Entry {
    value: bool,
    inserted_at: Instant,
    last_used: u64,
}

impl Entry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

impl Default for VerificationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
            inner: Mutex::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Look up a cached outcome. Expired entries count as absent and are
    /// dropped; a hit refreshes the entry's recency.
    pub async fn get(&self, key: &str) -> Option<bool> {
        let mut inner = self.inner.lock().await;

        let expired = match inner.entries.get(key) {
            Some(entry) => !entry.is_fresh(self.ttl),
            None => return None,
        };
        if expired {
            inner.entries.remove(key);
            return None;
        }

        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = clock;
        Some(entry.value)
    }

    /// Record an outcome. Re-inserting an existing key refreshes both its
    /// recency and its expiry anchor; when the capacity would be exceeded
    /// the least-recently-used entry is evicted.
    pub async fn put(&self, key: String, value: bool) {
        let mut inner = self.inner.lock().await;

        inner.clock += 1;
        let clock = inner.clock;
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                last_used: clock,
            },
        );

        if inner.entries.len() > self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }
    }

    /// Drop every entry. Required after a secret or salt rotation, since
    /// cached outcomes would otherwise outlive the keys that produced them.
    pub async fn clear(&self) {
        self.inner.lock().await.entries.clear();
    }
}
