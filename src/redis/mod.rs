pub mod client;
pub mod pool;
pub mod script;

pub use client::RedisStore;

use crate::errors::Result;
use async_trait::async_trait;

/// Shared bucket store.
///
/// All mutable rate-limit state lives behind this trait; one call covers
/// the whole read-modify-write of a bucket record. Implementations must
/// execute the check-and-consume atomically with respect to concurrent
/// callers on the same key, since multiple service instances issue
/// decisions for the same identity.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Run the token-bucket decision for `key` as one atomic unit.
    ///
    /// `fill_rate` is tokens per second, `burst` the bucket capacity,
    /// `now` the current time in seconds (caller-supplied). Returns
    /// whether the request is allowed.
    async fn check_and_consume(
        &self,
        key: &str,
        fill_rate: f64,
        burst: i64,
        now: i64,
    ) -> Result<bool>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<()>;
}
