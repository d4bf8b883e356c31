//! Status enums tracked by the cart manager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trust level of the locally held cart relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Nothing loaded yet.
    Fresh,
    /// Local cart matches the last server response.
    Valid,
    /// Local cart has unsent mutations.
    Invalid,
    /// A server call is in flight.
    Pending,
    /// The last server call failed.
    Error,
}

impl CacheStatus {
    /// Lowercase name, as used in logs and serialized state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the most recent coupon submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    /// No coupon submitted (or it was removed).
    Fresh,
    /// Coupon submitted, waiting for the server.
    Pending,
    /// Server applied the coupon.
    Applied,
    /// Server refused the coupon.
    Rejected,
    /// The server call carrying the coupon failed.
    Error,
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fresh => "fresh",
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Rejected => "rejected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Progress of the most recent variant change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantRequestStatus {
    /// No variant change requested.
    Fresh,
    /// Variant change sent, waiting for the server.
    Pending,
    /// Server accepted the variant change.
    Valid,
    /// The server call carrying the variant change failed.
    Error,
}

/// Variant the UI should keep showing for a line item while the server
/// catches up with a `change_item_variant` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSelectOverride {
    /// Line item uuid.
    pub uuid: String,
    /// Slug the user picked.
    pub override_selected_product_slug: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&CacheStatus::Invalid).unwrap(),
            "\"invalid\""
        );
        assert_eq!(
            serde_json::to_string(&CouponStatus::Applied).unwrap(),
            "\"applied\""
        );
        assert_eq!(
            serde_json::to_string(&VariantRequestStatus::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn cache_status_display_matches_serde() {
        for status in [
            CacheStatus::Fresh,
            CacheStatus::Valid,
            CacheStatus::Invalid,
            CacheStatus::Pending,
            CacheStatus::Error,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.to_string());
        }
    }
}
