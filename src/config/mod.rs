pub mod loader;
pub mod validator;

use crate::errors::{RateLimitError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete application configuration, loaded once at startup and
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Redis configuration (loaded from environment variables)
    pub redis: RedisConfig,

    /// Static tier table (loaded from file, or built-in defaults)
    pub tiers: TierConfig,

    /// What to do with a request when the store is unreachable
    pub failure_policy: FailurePolicy,
}

/// Redis connection configuration (loaded from environment variables)
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., "redis://localhost:6379")
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: usize,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Command timeout in seconds (bounds the per-decision script call)
    pub command_timeout_secs: u64,
}

impl RedisConfig {
    /// Load Redis configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            max_connections: std::env::var("REDIS_MAX_CONN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),

            connection_timeout_secs: std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),

            command_timeout_secs: std::env::var("REDIS_COMMAND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            max_connections: 50,
            connection_timeout_secs: 5,
            command_timeout_secs: 2,
        }
    }
}

/// Verdict to apply when the bucket store is unreachable.
///
/// Fail-open trades strict enforcement for availability: during a store
/// outage the limit is not enforced at all. Fail-closed rejects every
/// guarded request for the duration of the outage. Both are reasonable,
/// which is why this is configuration rather than a hardcoded choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Open,
    Closed,
}

impl FailurePolicy {
    /// Read `RATE_LIMIT_FAILURE_POLICY` ("open" | "closed"), defaulting
    /// to fail-open.
    pub fn from_env() -> Self {
        match std::env::var("RATE_LIMIT_FAILURE_POLICY") {
            Ok(v) if v.eq_ignore_ascii_case("closed") => FailurePolicy::Closed,
            _ => FailurePolicy::Open,
        }
    }
}

/// A single named rate-limiting tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Tier name (e.g., "free", "premium", "anonymous")
    pub name: String,

    /// Sustained permits per `period`
    pub rate: f64,

    /// Maximum bucket capacity (burst size)
    pub burst: i64,

    /// Window in seconds over which `rate` applies
    pub period: f64,
}

impl TierPolicy {
    /// Tokens added to the bucket per second of elapsed time.
    pub fn fill_rate(&self) -> f64 {
        self.rate / self.period
    }
}

/// Tier table configuration (loaded from JSON file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    /// Named tiers
    pub tiers: Vec<TierPolicy>,

    /// Tier applied to unauthenticated callers and unknown tier claims
    #[serde(default = "default_fallback_tier")]
    pub fallback: String,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierPolicy {
                    name: "free".to_string(),
                    rate: 5.0,
                    burst: 10,
                    period: 60.0,
                },
                TierPolicy {
                    name: "premium".to_string(),
                    rate: 20.0,
                    burst: 25,
                    period: 60.0,
                },
                TierPolicy {
                    name: "anonymous".to_string(),
                    rate: 2.0,
                    burst: 2,
                    period: 60.0,
                },
            ],
            fallback: default_fallback_tier(),
        }
    }
}

fn default_fallback_tier() -> String {
    "anonymous".to_string()
}

/// Immutable tier lookup table, built once at startup and shared by
/// reference with the decision component. Read-only after construction,
/// so no synchronization is needed on the policy data itself.
#[derive(Debug)]
pub struct TierTable {
    policies: HashMap<String, TierPolicy>,
    fallback: TierPolicy,
}

impl TierTable {
    pub fn new(config: &TierConfig) -> Result<Self> {
        let mut policies = HashMap::new();
        for tier in &config.tiers {
            policies.insert(tier.name.clone(), tier.clone());
        }

        let fallback = policies
            .get(&config.fallback)
            .cloned()
            .ok_or_else(|| {
                RateLimitError::ConfigurationError(format!(
                    "fallback tier '{}' is not defined in the tier table",
                    config.fallback
                ))
            })?;

        Ok(Self { policies, fallback })
    }

    /// Look up a tier by name, silently falling back to the fallback
    /// tier for unknown names.
    pub fn resolve(&self, name: &str) -> &TierPolicy {
        self.policies.get(name).unwrap_or(&self.fallback)
    }

    /// The tier applied to callers without an identity.
    pub fn fallback(&self) -> &TierPolicy {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
