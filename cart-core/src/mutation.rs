//! Local cart mutations.
//!
//! These are the user intents the manager applies optimistically to its
//! copy of the cart before the server confirms them. The helpers here only
//! touch the [`ResponseCart`]; status bookkeeping lives in [`crate::state`].

use cart_types::{CartEvent, CartLocation, RequestCartProduct, ResponseCart, ResponseCartProduct};

/// A mutating intent issued by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Append a line item.
    AddItem(RequestCartProduct),
    /// Remove a line item by uuid.
    RemoveItem {
        /// Line item to remove.
        uuid: String,
    },
    /// Swap a line item for another variant of the same product.
    ReplaceItem {
        /// Line item to replace.
        uuid: String,
        /// New product slug.
        new_product_slug: String,
        /// New product id.
        new_product_id: u64,
    },
    /// Change the tax location.
    SetLocation(CartLocation),
    /// Submit a coupon code.
    AddCoupon(String),
    /// Remove the coupon.
    RemoveCoupon,
}

impl CartMutation {
    /// Whether this mutation changes the coupon.
    pub fn touches_coupon(&self) -> bool {
        matches!(self, Self::AddCoupon(_) | Self::RemoveCoupon)
    }

    /// Whether this mutation changes a line item's variant.
    pub fn touches_variant(&self) -> bool {
        matches!(self, Self::ReplaceItem { .. })
    }

    /// The notification emitted when this intent is dispatched, if any.
    pub fn intent_event(&self) -> Option<CartEvent> {
        match self {
            Self::AddItem(product) => Some(CartEvent::CartAddItem(product.clone())),
            Self::RemoveItem { uuid } => Some(CartEvent::CartRemoveItem { uuid: uuid.clone() }),
            Self::ReplaceItem {
                uuid,
                new_product_slug,
                new_product_id,
            } => Some(CartEvent::CartChangeVariant {
                uuid: uuid.clone(),
                product_slug: new_product_slug.clone(),
                product_id: *new_product_id,
            }),
            Self::AddCoupon(coupon) => Some(CartEvent::CartCouponSubmitted {
                coupon: coupon.clone(),
            }),
            Self::SetLocation(_) | Self::RemoveCoupon => None,
        }
    }
}

/// Append a provisional line item.
pub fn add_item(cart: &mut ResponseCart, uuid: &str, product: &RequestCartProduct) {
    cart.products
        .push(ResponseCartProduct::provisional(uuid.to_string(), product));
}

/// Remove a line item. Returns false if no item has that uuid.
pub fn remove_item(cart: &mut ResponseCart, uuid: &str) -> bool {
    let before = cart.products.len();
    cart.products.retain(|p| p.uuid != uuid);
    cart.products.len() != before
}

/// Replace a line item's product in place, keeping its position and
/// metadata. Returns false if no item has that uuid.
pub fn replace_item(
    cart: &mut ResponseCart,
    uuid: &str,
    new_product_slug: &str,
    new_product_id: u64,
) -> bool {
    match cart.products.iter_mut().find(|p| p.uuid == uuid) {
        Some(product) => {
            product.product_slug = new_product_slug.to_string();
            product.product_id = new_product_id;
            true
        }
        None => false,
    }
}

/// Set the tax location. Returns false if it is unchanged.
pub fn set_location(cart: &mut ResponseCart, location: &CartLocation) -> bool {
    if !location.differs_from(&cart.tax.location) {
        return false;
    }
    cart.tax.location = location.clone();
    true
}

/// Set the coupon code. It stays unapplied until the server says otherwise.
pub fn add_coupon(cart: &mut ResponseCart, coupon: &str) {
    cart.coupon = coupon.to_string();
    cart.is_coupon_applied = false;
    cart.coupon_discount_integer = 0;
}

/// Clear the coupon.
pub fn remove_coupon(cart: &mut ResponseCart) {
    cart.coupon.clear();
    cart.is_coupon_applied = false;
    cart.coupon_discount_integer = 0;
}
