//! Notifications emitted to the application layer.
//!
//! Serialized as `{ "type": "CART_ADD_ITEM", "payload": ... }`.

use serde::{Deserialize, Serialize};

use crate::{CartErrorKind, RequestCartProduct};

/// Structured notification for external listeners (analytics, toasts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum CartEvent {
    /// Initialization started.
    CartInitStart,
    /// Initial cart received.
    CartInitComplete,
    /// An item was added locally.
    CartAddItem(RequestCartProduct),
    /// An item was removed locally.
    CartRemoveItem {
        /// Removed line item.
        uuid: String,
    },
    /// An item's variant was changed locally.
    CartChangeVariant {
        /// Line item being replaced.
        uuid: String,
        /// New product slug.
        product_slug: String,
        /// New product id.
        product_id: u64,
    },
    /// A coupon was submitted.
    CartCouponSubmitted {
        /// The coupon code.
        coupon: String,
    },
    /// The server applied a coupon.
    CartCouponApplied {
        /// The coupon code.
        coupon: String,
    },
    /// The server refused a coupon.
    CartCouponRejected {
        /// The coupon code.
        coupon: String,
        /// Server message, if one was returned.
        message: Option<String>,
    },
    /// A server call failed.
    CartError {
        /// Which call failed.
        kind: CartErrorKind,
        /// Error message.
        message: String,
    },
}

impl CartEvent {
    /// The `type` tag of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CartInitStart => "CART_INIT_START",
            Self::CartInitComplete => "CART_INIT_COMPLETE",
            Self::CartAddItem(_) => "CART_ADD_ITEM",
            Self::CartRemoveItem { .. } => "CART_REMOVE_ITEM",
            Self::CartChangeVariant { .. } => "CART_CHANGE_VARIANT",
            Self::CartCouponSubmitted { .. } => "CART_COUPON_SUBMITTED",
            Self::CartCouponApplied { .. } => "CART_COUPON_APPLIED",
            Self::CartCouponRejected { .. } => "CART_COUPON_REJECTED",
            Self::CartError { .. } => "CART_ERROR",
        }
    }
}
