use crate::config::RedisConfig;
use crate::errors::{RateLimitError, Result};
use deadpool::managed::PoolConfig as DeadpoolPoolConfig;
use deadpool_redis::{Config as DeadpoolRedisConfig, Pool, Runtime};
use redis::RedisError;
use std::time::Duration;
use tracing::{debug, info};

/// Create a Redis connection pool from configuration
pub async fn create_redis_pool(config: &RedisConfig) -> Result<Pool> {
    info!("Creating Redis connection pool...");

    let mut cfg = DeadpoolRedisConfig::from_url(config.url.clone());

    let mut pool_config = DeadpoolPoolConfig::new(config.max_connections);
    pool_config.timeouts.wait = Some(Duration::from_secs(config.connection_timeout_secs));
    cfg.pool = Some(pool_config);

    let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
        RateLimitError::RedisConnectionError(RedisError::from((
            redis::ErrorKind::IoError,
            "Pool creation failed",
            e.to_string(),
        )))
    })?;

    info!(
        "Redis connection pool created (max_connections: {})",
        config.max_connections
    );

    // Test connection
    debug!("Testing Redis connection...");
    let mut conn = pool.get().await.map_err(|e| {
        RateLimitError::RedisConnectionError(RedisError::from((
            redis::ErrorKind::IoError,
            "Failed to get connection",
            e.to_string(),
        )))
    })?;

    let _pong: String = redis::cmd("PING")
        .query_async(&mut *conn)
        .await
        .map_err(RateLimitError::RedisConnectionError)?;

    info!("Redis connection test successful");

    Ok(pool)
}
