use crate::config::{FailurePolicy, TierTable};
use crate::limiter::identity::resolve_caller;
use crate::limiter::{Decision, RateLimiter, RequestHints};
use crate::metrics;
use crate::redis::BucketStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Token-bucket rate limiter backed by a shared bucket store.
///
/// Owns no mutable state of its own; every decision is one atomic
/// check-and-consume against the store.
pub struct TokenBucketLimiter<S: BucketStore> {
    store: Arc<S>,
    tiers: Arc<TierTable>,
    failure_policy: FailurePolicy,
}

impl<S: BucketStore> TokenBucketLimiter<S> {
    pub fn new(store: Arc<S>, tiers: Arc<TierTable>, failure_policy: FailurePolicy) -> Self {
        Self {
            store,
            tiers,
            failure_policy,
        }
    }
}

#[async_trait]
impl<S: BucketStore + 'static> RateLimiter for TokenBucketLimiter<S> {
    async fn check(&self, hints: &RequestHints, now: i64) -> Decision {
        let (key, policy) = resolve_caller(&self.tiers, hints);

        debug!(
            "Checking rate limit: key={}, tier={}, fill_rate={:.4}, burst={}",
            key,
            policy.name,
            policy.fill_rate(),
            policy.burst
        );

        match self
            .store
            .check_and_consume(&key, policy.fill_rate(), policy.burst, now)
            .await
        {
            Ok(true) => Decision::allowed(&policy.name),
            Ok(false) => Decision::denied(&policy.name),
            Err(e) => {
                error!("Store error during rate limit check: {}", e);
                metrics::record_store_error(e.kind());

                match self.failure_policy {
                    FailurePolicy::Open => {
                        // The limit is not enforced while the store is
                        // down; availability wins over strictness here.
                        warn!("Failing open for key '{}': {}", key, e);
                        Decision::error_allowed(&policy.name)
                    }
                    FailurePolicy::Closed => {
                        warn!("Failing closed for key '{}': {}", key, e);
                        Decision::denied(&policy.name)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierConfig;
    use crate::limiter::Outcome;
    use crate::redis::memory::{FailingStore, MemoryStore};

    fn limiter<S: BucketStore>(store: Arc<S>, policy: FailurePolicy) -> TokenBucketLimiter<S> {
        let tiers = Arc::new(TierTable::new(&TierConfig::default()).unwrap());
        TokenBucketLimiter::new(store, tiers, policy)
    }

    fn free_hints(user_id: &str) -> RequestHints {
        RequestHints {
            user_id: Some(user_id.to_string()),
            tier: Some("free".to_string()),
            remote_addr: "198.51.100.1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_request_creates_bucket_and_allows() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        let decision = limiter.check(&free_hints("alice"), 0).await;
        assert!(decision.allowed);
        assert_eq!(decision.outcome, Outcome::Allowed);
        assert_eq!(decision.tier, "free");

        // Creation charges the first request: free burst is 10.
        let record = store.record("rate_limit:alice").unwrap();
        assert_eq!(record.tokens, 9.0);
        assert_eq!(record.last_seen, 0);
    }

    #[tokio::test]
    async fn test_burst_exhausts_then_denies() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        // Free tier: {rate: 5, burst: 10, period: 60}.
        for i in 0..10 {
            let decision = limiter.check(&free_hints("alice"), 0).await;
            assert!(decision.allowed, "request {} should be allowed", i);
        }

        let decision = limiter.check(&free_hints("alice"), 0).await;
        assert!(!decision.allowed);
        assert_eq!(decision.outcome, Outcome::Denied);

        let record = store.record("rate_limit:alice").unwrap();
        assert_eq!(record.tokens, 0.0);
    }

    #[tokio::test]
    async fn test_refill_allows_after_wait() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        // Drain the free bucket at t=0, then wait 12s: fill rate is
        // 5/60 = 1/12 token per second, so exactly one token returns.
        for _ in 0..10 {
            assert!(limiter.check(&free_hints("alice"), 0).await.allowed);
        }
        assert!(!limiter.check(&free_hints("alice"), 0).await.allowed);

        let decision = limiter.check(&free_hints("alice"), 12).await;
        assert!(decision.allowed);

        let record = store.record("rate_limit:alice").unwrap();
        assert!(record.tokens.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_steady_sub_rate_traffic_is_never_throttled() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        // One request every 12s refills exactly what each consumes.
        let mut now = 0;
        for _ in 0..50 {
            assert!(limiter.check(&free_hints("alice"), now).await.allowed);
            now += 12;
        }
    }

    #[tokio::test]
    async fn test_idle_period_does_not_overfill() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        for _ in 0..10 {
            assert!(limiter.check(&free_hints("alice"), 0).await.allowed);
        }

        // A week of idle time refills to the cap, never beyond it.
        let later = 7 * 24 * 3600;
        for i in 0..10 {
            let decision = limiter.check(&free_hints("alice"), later).await;
            assert!(decision.allowed, "request {} should be allowed", i);
        }
        assert!(!limiter.check(&free_hints("alice"), later).await.allowed);
    }

    #[tokio::test]
    async fn test_clock_skew_does_not_refill() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        for _ in 0..10 {
            assert!(limiter.check(&free_hints("alice"), 1000).await.allowed);
        }
        assert!(!limiter.check(&free_hints("alice"), 1000).await.allowed);

        // A now far behind last_seen must not grant tokens or corrupt
        // the record.
        let decision = limiter.check(&free_hints("alice"), 500).await;
        assert!(!decision.allowed);

        let record = store.record("rate_limit:alice").unwrap();
        assert_eq!(record.tokens, 0.0);
        assert_eq!(record.last_seen, 500);
    }

    #[tokio::test]
    async fn test_elapsed_is_not_double_counted_across_denials() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        for _ in 0..10 {
            assert!(limiter.check(&free_hints("alice"), 0).await.allowed);
        }

        // 6s buys half a token: denied, and each denial advances
        // last_seen without banking the partial refill, so every call
        // 6s after the previous one sees only 6s of elapsed time.
        assert!(!limiter.check(&free_hints("alice"), 6).await.allowed);
        assert!(!limiter.check(&free_hints("alice"), 12).await.allowed);
        assert!(!limiter.check(&free_hints("alice"), 18).await.allowed);

        // A full 12s since the last denial finally buys one token.
        assert!(limiter.check(&free_hints("alice"), 30).await.allowed);
    }

    #[tokio::test]
    async fn test_unknown_tier_gets_fallback_limits() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        let hints = RequestHints {
            user_id: Some("bob".to_string()),
            tier: Some("platinum".to_string()),
            remote_addr: "198.51.100.1".to_string(),
        };

        // Anonymous burst is 2, not free's 10 or premium's 25.
        assert!(limiter.check(&hints, 0).await.allowed);
        let decision = limiter.check(&hints, 0).await;
        assert!(decision.allowed);
        assert_eq!(decision.tier, "anonymous");
        assert!(!limiter.check(&hints, 0).await.allowed);
    }

    #[tokio::test]
    async fn test_store_error_fails_open() {
        let limiter = limiter(Arc::new(FailingStore), FailurePolicy::Open);

        let decision = limiter.check(&free_hints("alice"), 0).await;
        assert!(decision.allowed);
        assert_eq!(decision.outcome, Outcome::ErrorAllowed);
    }

    #[tokio::test]
    async fn test_store_error_fails_closed() {
        let limiter = limiter(Arc::new(FailingStore), FailurePolicy::Closed);

        let decision = limiter.check(&free_hints("alice"), 0).await;
        assert!(!decision.allowed);
        assert_eq!(decision.outcome, Outcome::Denied);
    }

    #[tokio::test]
    async fn test_concurrent_checks_admit_at_most_burst() {
        let store = Arc::new(MemoryStore::new());
        let limiter = Arc::new(limiter(store.clone(), FailurePolicy::Open));

        let mut handles = Vec::new();
        for _ in 0..25 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.check(&free_hints("alice"), 0).await.allowed
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 10);
    }

    #[tokio::test]
    async fn test_distinct_identities_get_distinct_buckets() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), FailurePolicy::Open);

        for _ in 0..10 {
            assert!(limiter.check(&free_hints("alice"), 0).await.allowed);
        }
        assert!(!limiter.check(&free_hints("alice"), 0).await.allowed);

        // Alice's empty bucket must not affect Bob.
        assert!(limiter.check(&free_hints("bob"), 0).await.allowed);
    }
}
