//! Canonical order status

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Internal order state, decoupled from the remote platform vocabulary.
///
/// Remote status strings are mapped onto this enum by the sync engine's
/// normalizer; the local datastore only ever stores these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 7] = [
        CanonicalStatus::Pending,
        CanonicalStatus::Processing,
        CanonicalStatus::Shipped,
        CanonicalStatus::Completed,
        CanonicalStatus::Cancelled,
        CanonicalStatus::Refunded,
        CanonicalStatus::Failed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Pending => "pending",
            CanonicalStatus::Processing => "processing",
            CanonicalStatus::Shipped => "shipped",
            CanonicalStatus::Completed => "completed",
            CanonicalStatus::Cancelled => "cancelled",
            CanonicalStatus::Refunded => "refunded",
            CanonicalStatus::Failed => "failed",
        }
    }

    /// Cancelled, refunded and failed orders never move again on their own.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            CanonicalStatus::Cancelled | CanonicalStatus::Refunded | CanonicalStatus::Failed
        )
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of a stored canonical value (not a remote status string).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a canonical order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for CanonicalStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matches_as_str() {
        for status in CanonicalStatus::ALL {
            assert_eq!(status.as_str().parse::<CanonicalStatus>(), Ok(status));
        }
        assert!("on-hold".parse::<CanonicalStatus>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&CanonicalStatus::Refunded).unwrap();
        assert_eq!(json, "\"refunded\"");
    }
}
