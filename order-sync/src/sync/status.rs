//! Status Normalizer
//!
//! Maps the platform's status vocabulary onto [`CanonicalStatus`]. Total:
//! every input yields a status, unknown tokens fall back to `Pending`.

use parking_lot::Mutex;
use shared::order::CanonicalStatus;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Distinct unknown tokens remembered for once-only warnings
const MAX_REPORTED_UNKNOWN: usize = 64;

/// Unknown tokens already reported (logged once per distinct value)
static REPORTED_UNKNOWN: LazyLock<Mutex<HashSet<String>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Normalize a raw remote status token
///
/// Case-insensitive; surrounding whitespace and a `wc-` prefix are ignored.
pub fn normalize(remote_status: &str) -> CanonicalStatus {
    let token = remote_status.trim().to_ascii_lowercase();
    let token = token.strip_prefix("wc-").unwrap_or(&token);

    match token {
        "pending" | "on-hold" => CanonicalStatus::Pending,
        "processing" => CanonicalStatus::Processing,
        "shipped" => CanonicalStatus::Shipped,
        "completed" => CanonicalStatus::Completed,
        "refunded" => CanonicalStatus::Refunded,
        "failed" => CanonicalStatus::Failed,
        t if t.starts_with("cancel") => CanonicalStatus::Cancelled,
        _ => {
            report_unknown(token);
            CanonicalStatus::Pending
        }
    }
}

fn report_unknown(token: &str) {
    let first_time = remember_unknown(&mut REPORTED_UNKNOWN.lock(), token);
    if first_time {
        tracing::warn!(status = %token, "Unknown remote order status, treating as pending");
    } else {
        tracing::debug!(status = %token, "Unknown remote order status, treating as pending");
    }
}

/// `true` when the token is new and was remembered; a full set stays full
fn remember_unknown(seen: &mut HashSet<String>, token: &str) -> bool {
    if seen.len() >= MAX_REPORTED_UNKNOWN || seen.contains(token) {
        return false;
    }
    seen.insert(token.to_string())
}
