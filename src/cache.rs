//! Rendered-response cache for the gateway.
//!
//! The cache stores the fully rendered status+body of a request keyed by
//! (route, raw query string) for a fixed time-to-live. Expiry is passive: a
//! read past the deadline is a miss, and the stale entry sits in the map
//! until the next store for that key overwrites it. Error responses are
//! stored the same way as successes, so a cached 400 replays verbatim.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of the current instant. The binary installs [`SystemClock`]; tests
/// install a manually advanced clock so expiry never depends on sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by `Instant::now`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Key for one cached rendering: the route path plus the raw query string
/// exactly as received. Distinct query strings are distinct keys; a request
/// with no query string at all keys under the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    route: &'static str,
    query: String,
}

impl CacheKey {
    pub fn new(route: &'static str, query: &str) -> Self {
        Self {
            route,
            query: query.to_owned(),
        }
    }
}

/// The stored rendering: HTTP status plus the serialized JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub body: String,
}

struct CacheEntry {
    response: CachedResponse,
    expires_at: Instant,
}

/// Process-local TTL cache shared by all request workers.
///
/// There is no per-key locking across the compute step: two concurrent
/// misses for the same key may both reach upstream, and the later store
/// wins. The map itself is protected by a single mutex, which is plenty for
/// the short critical sections here. No eviction and no manual invalidation;
/// memory is bounded only by key diversity.
pub struct ResponseCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Returns the stored rendering for `key` if it has not expired yet.
    pub fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if self.clock.now() >= entry.expires_at {
            return None;
        }
        Some(entry.response.clone())
    }

    /// Stores `response` under `key` with a fresh TTL, replacing whatever
    /// was there before.
    pub fn store(&self, key: CacheKey, response: CachedResponse) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries.lock().insert(
            key,
            CacheEntry {
                response,
                expires_at,
            },
        );
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use super::Clock;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    /// Clock whose current instant only moves when a test advances it.
    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::ManualClock;
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    fn cache_with_manual_clock() -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(TTL, clock.clone());
        (cache, clock)
    }

    fn response(status: u16, body: &str) -> CachedResponse {
        CachedResponse {
            status,
            body: body.to_owned(),
        }
    }

    #[test]
    fn lookup_misses_on_empty_cache() {
        let (cache, _clock) = cache_with_manual_clock();
        assert!(cache.lookup(&CacheKey::new("/channel", "id=X")).is_none());
    }

    #[test]
    fn stored_response_is_returned_before_expiry() {
        let (cache, clock) = cache_with_manual_clock();
        let key = CacheKey::new("/channel", "id=X");
        cache.store(key.clone(), response(200, r#"{"title":"t"}"#));

        clock.advance(TTL - Duration::from_secs(1));
        assert_eq!(cache.lookup(&key), Some(response(200, r#"{"title":"t"}"#)));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (cache, clock) = cache_with_manual_clock();
        let key = CacheKey::new("/stats", "id=abc");
        cache.store(key.clone(), response(200, "{}"));

        clock.advance(TTL);
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn store_refreshes_an_expired_entry() {
        let (cache, clock) = cache_with_manual_clock();
        let key = CacheKey::new("/stats", "id=abc");
        cache.store(key.clone(), response(200, "old"));
        clock.advance(TTL);

        cache.store(key.clone(), response(200, "new"));
        assert_eq!(cache.lookup(&key), Some(response(200, "new")));
    }

    #[test]
    fn distinct_query_strings_are_distinct_keys() {
        let (cache, _clock) = cache_with_manual_clock();
        cache.store(CacheKey::new("/channel", "id=X"), response(200, "x"));

        assert!(cache.lookup(&CacheKey::new("/channel", "id=Y")).is_none());
        assert_eq!(
            cache.lookup(&CacheKey::new("/channel", "id=X")),
            Some(response(200, "x"))
        );
    }

    #[test]
    fn distinct_routes_are_distinct_keys() {
        let (cache, _clock) = cache_with_manual_clock();
        cache.store(CacheKey::new("/channel", "id=X"), response(200, "x"));
        assert!(cache.lookup(&CacheKey::new("/stats", "id=X")).is_none());
    }

    #[test]
    fn error_responses_are_cached_like_successes() {
        let (cache, _clock) = cache_with_manual_clock();
        let key = CacheKey::new("/channel", "");
        cache.store(key.clone(), response(400, r#"{"error":"No channel ID provided"}"#));

        assert_eq!(
            cache.lookup(&key),
            Some(response(400, r#"{"error":"No channel ID provided"}"#))
        );
    }
}
