pub mod config;
pub mod errors;
pub mod limiter;
pub mod metrics;
pub mod redis;
pub mod server;

// Re-export commonly used types
pub use config::{AppConfig, FailurePolicy, TierConfig, TierPolicy, TierTable};
pub use errors::{RateLimitError, Result};
pub use limiter::{Decision, Outcome, RateLimiter, RequestHints, TokenBucketLimiter};
pub use server::{start_server, AppState, ServerConfig};
