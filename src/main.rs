use std::sync::Arc;
use std::time::Duration;

use tollgate::config::loader::load_config;
use tollgate::config::TierTable;
use tollgate::limiter::TokenBucketLimiter;
use tollgate::redis::pool::create_redis_pool;
use tollgate::redis::{BucketStore, RedisStore};
use tollgate::server::{start_server, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Rate Limiter Service Starting...");

    let config = load_config().await?;

    let pool = create_redis_pool(&config.redis).await?;
    let store = Arc::new(
        RedisStore::new(
            pool,
            Duration::from_secs(config.redis.command_timeout_secs),
        )
        .await?,
    );

    let tiers = Arc::new(TierTable::new(&config.tiers)?);
    let limiter = Arc::new(TokenBucketLimiter::new(
        Arc::clone(&store),
        tiers,
        config.failure_policy,
    ));

    let state = Arc::new(AppState {
        limiter,
        store: store as Arc<dyn BucketStore>,
    });

    let server_config = ServerConfig::from_env();
    tracing::info!("Server will listen on: {}", server_config.addr());

    start_server(server_config, state).await?;

    Ok(())
}
