use crate::config::{TierPolicy, TierTable};
use crate::limiter::RequestHints;

/// Namespace prefix for bucket keys in the store
const KEY_NAMESPACE: &str = "rate_limit";

/// Resolve a request's hints into a bucket key and the policy to apply.
///
/// A caller without an identity is addressed by network address and
/// forced to the fallback tier; any tier claim it makes is ignored, so
/// an anonymous caller cannot buy itself a privileged tier. Unknown
/// tier names silently resolve to the fallback policy.
///
/// Pure function of the hints and the static tier table.
pub fn resolve_caller<'a>(table: &'a TierTable, hints: &RequestHints) -> (String, &'a TierPolicy) {
    match hints.user_id.as_deref() {
        Some(user_id) if !user_id.is_empty() => {
            let policy = match hints.tier.as_deref() {
                Some(tier) => table.resolve(tier),
                None => table.fallback(),
            };
            (bucket_key(user_id), policy)
        }
        _ => (bucket_key(&hints.remote_addr), table.fallback()),
    }
}

/// Deterministic, namespaced bucket key for an identity. The same
/// logical caller maps to the same key on every instance and across
/// restarts.
fn bucket_key(identity: &str) -> String {
    format!("{}:{}", KEY_NAMESPACE, identity)
}
