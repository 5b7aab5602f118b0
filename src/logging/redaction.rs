/// Placeholder written in place of the secret part of a cache key
pub const REDACTED: &str = "[REDACTED]";

/// Redact a cache key for log output.
///
/// Keys derived from credentials carry a digest after the first `:`
/// (`realm:user:digest`, `cert:digest`, `sso:digest`). Only the first segment
/// is kept. Keys without a separator are custom keys and are fully redacted.
pub fn redact_key(key: &str) -> String {
    match key.split_once(':') {
        Some((prefix, _)) if !prefix.is_empty() => format!("{prefix}:{REDACTED}"),
        _ => REDACTED.to_string(),
    }
}
