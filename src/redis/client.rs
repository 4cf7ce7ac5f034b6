use crate::errors::{RateLimitError, Result};
use crate::metrics;
use crate::redis::script::{get_script, load_script};
use crate::redis::BucketStore;
use async_trait::async_trait;
use deadpool_redis::Pool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Redis-backed bucket store.
///
/// Every decision is one EVALSHA of the token-bucket script; the Rust
/// side never reads and writes bucket fields separately.
pub struct RedisStore {
    pool: Arc<Pool>,
    command_timeout: Duration,
}

impl RedisStore {
    /// Create a new store and register the decision script with Redis
    pub async fn new(pool: Pool, command_timeout: Duration) -> Result<Self> {
        let pool = Arc::new(pool);

        let mut conn = pool.get().await.map_err(|e| {
            RateLimitError::InternalError(format!(
                "Failed to get connection for script loading: {}",
                e
            ))
        })?;
        let _sha = load_script(&mut *conn).await?;

        Ok(Self {
            pool,
            command_timeout,
        })
    }
}

#[async_trait]
impl BucketStore for RedisStore {
    async fn check_and_consume(
        &self,
        key: &str,
        fill_rate: f64,
        burst: i64,
        now: i64,
    ) -> Result<bool> {
        let mut conn = self.pool.get().await.map_err(|e| {
            error!("Failed to get Redis connection: {}", e);
            RateLimitError::RedisConnectionError(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "Pool exhausted",
                e.to_string(),
            )))
        })?;

        debug!(
            "Executing token bucket script: key={}, fill_rate={:.4}, burst={}, now={}",
            key, fill_rate, burst, now
        );

        let script = get_script();
        let mut invocation = script.prepare_invoke();
        invocation.key(key).arg(fill_rate).arg(burst).arg(now);

        let started = Instant::now();

        let allowed: i64 = tokio::time::timeout(
            self.command_timeout,
            invocation.invoke_async::<i64>(&mut *conn),
        )
        .await
        .map_err(|_| RateLimitError::StoreTimeout(self.command_timeout))?
        .map_err(|e| {
            error!("Script execution failed: {}", e);
            RateLimitError::ScriptExecutionError(format!("Script execution failed: {}", e))
        })?;

        metrics::observe_store_duration(started.elapsed().as_secs_f64());

        debug!("Script result: allowed={}", allowed);

        Ok(allowed == 1)
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(|e| {
            RateLimitError::RedisConnectionError(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "Pool exhausted",
                e.to_string(),
            )))
        })?;

        let cmd = redis::cmd("PING");

        let response: String =
            tokio::time::timeout(self.command_timeout, cmd.query_async::<String>(&mut *conn))
                .await
                .map_err(|_| RateLimitError::StoreTimeout(self.command_timeout))?
                .map_err(RateLimitError::RedisConnectionError)?;

        if response != "PONG" {
            return Err(RateLimitError::InternalError(format!(
                "Unexpected PING response: {}",
                response
            )));
        }

        Ok(())
    }
}
