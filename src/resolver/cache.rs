use dashmap::DashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::metrics;
use crate::types::MatchResult;

/// Memoizes decisions by normalized slug. Entries are only ever dropped by
/// expiry or an explicit `invalidate`; store writes do not reach the cache.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Option<MatchResult>;
    fn insert(&self, key: &str, result: MatchResult);
    fn invalidate(&self, key: &str);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CacheEntry {
    result: MatchResult,
    expires_at: Instant,
}

/// Shared TTL cache. Concurrent inserts for the same key race harmlessly:
/// recomputation against an unchanged store yields the same decision, so the
/// last write wins.
pub struct TtlResultCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl TtlResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl ResultCache for TtlResultCache {
    fn get(&self, key: &str) -> Option<MatchResult> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.result.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= Instant::now());
        }
        None
    }

    fn insert(&self, key: &str, result: MatchResult) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                result,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A cache that never remembers anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResultCache;

impl ResultCache for NoopResultCache {
    fn get(&self, _key: &str) -> Option<MatchResult> {
        None
    }

    fn insert(&self, _key: &str, _result: MatchResult) {}

    fn invalidate(&self, _key: &str) {}

    fn len(&self) -> usize {
        0
    }
}

/// Whether `get_or_resolve` answered from the cache or computed afresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Return the cached decision for `key`, or run `compute` and remember its
/// result. Errors are passed through and never cached.
pub async fn get_or_resolve<C, F, Fut>(cache: &C, key: &str, compute: F) -> Result<(MatchResult, CacheStatus)>
where
    C: ResultCache + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<MatchResult>>,
{
    if let Some(hit) = cache.get(key) {
        debug!(key, outcome = hit.outcome_label(), "Resolution cache hit");
        metrics::cache::hit();
        return Ok((hit, CacheStatus::Hit));
    }

    metrics::cache::miss();
    let result = compute().await?;
    cache.insert(key, result.clone());
    Ok((result, CacheStatus::Miss))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolverError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = TtlResultCache::new(Duration::from_secs(3600));
        cache.insert("albion-hotel", MatchResult::NotFound);
        assert_eq!(cache.get("albion-hotel"), Some(MatchResult::NotFound));

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(cache.get("albion-hotel").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("albion-hotel").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TtlResultCache::new(Duration::from_secs(10));
        cache.insert("a", MatchResult::NotFound);
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.insert("b", MatchResult::NotFound);
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }

    #[tokio::test]
    async fn test_get_or_resolve_computes_once() {
        let cache = TtlResultCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let (result, status) = get_or_resolve(&cache, "the-crown", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(MatchResult::NotFound)
            })
            .await
            .unwrap();
            assert_eq!(result, MatchResult::NotFound);
            statuses.push(status);
        }
        assert_eq!(statuses, [CacheStatus::Miss, CacheStatus::Hit, CacheStatus::Hit]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate("the-crown");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = TtlResultCache::new(Duration::from_secs(60));
        let result = get_or_resolve(&cache, "the-crown", || async {
            Err(ResolverError::store_unavailable("find_exact", "connection reset"))
        })
        .await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_noop_cache_always_recomputes() {
        let cache = NoopResultCache;
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let (_, status) = get_or_resolve(&cache, "x", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(MatchResult::NotFound)
            })
            .await
            .unwrap();
            assert_eq!(status, CacheStatus::Miss);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
