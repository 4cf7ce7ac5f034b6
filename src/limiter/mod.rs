pub mod identity;
pub mod token_bucket;

pub use token_bucket::TokenBucketLimiter;

use async_trait::async_trait;

/// How a decision was reached. `ErrorAllowed` marks a request that was
/// let through only because the store was unreachable and the failure
/// policy is fail-open; it must never be reported as a clean allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Denied,
    ErrorAllowed,
}

impl Outcome {
    /// Metric label value for this outcome
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Denied => "denied",
            Outcome::ErrorAllowed => "error_allowed",
        }
    }
}

/// Verdict for a single request
#[derive(Debug, Clone)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// How the verdict was reached
    pub outcome: Outcome,

    /// Name of the tier whose policy was applied
    pub tier: String,
}

impl Decision {
    pub fn allowed(tier: &str) -> Self {
        Self {
            allowed: true,
            outcome: Outcome::Allowed,
            tier: tier.to_string(),
        }
    }

    pub fn denied(tier: &str) -> Self {
        Self {
            allowed: false,
            outcome: Outcome::Denied,
            tier: tier.to_string(),
        }
    }

    pub fn error_allowed(tier: &str) -> Self {
        Self {
            allowed: true,
            outcome: Outcome::ErrorAllowed,
            tier: tier.to_string(),
        }
    }
}

/// Identity and tier hints extracted from an inbound request.
///
/// The surrounding HTTP layer only has to supply these as plain strings;
/// everything else is derived here.
#[derive(Debug, Clone)]
pub struct RequestHints {
    /// Caller-supplied identifier, if any
    pub user_id: Option<String>,

    /// Caller-claimed tier name, if any
    pub tier: Option<String>,

    /// Network address of the caller, used when no identifier is supplied
    pub remote_addr: String,
}

/// Trait for rate limiting algorithms.
///
/// `now` is caller-supplied wall-clock seconds rather than read inside
/// the implementation, which keeps decisions deterministic under test.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, hints: &RequestHints, now: i64) -> Decision;
}
