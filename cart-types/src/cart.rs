//! Cart payloads exchanged with the remote cart store.
//!
//! [`ResponseCart`] is what the server returns and is never edited in place
//! by the manager except through the optimistic mutations in `cart-core`.
//! [`RequestCart`] is what gets sent back on revalidation.

use serde::{Deserialize, Serialize};

use crate::CartTypesError;

/// A line item proposed by the client (add or replace intents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCartProduct {
    /// Product slug, e.g. `plan-personal`.
    pub product_slug: String,
    /// Numeric product id.
    pub product_id: u64,
    /// Product metadata (domain name for domain products, etc).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    /// Quantity.
    #[serde(default = "default_volume")]
    pub volume: u32,
    /// Free-form extra data passed through to the server.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

fn default_volume() -> u32 {
    1
}

impl RequestCartProduct {
    /// Create a product with volume 1 and no metadata.
    pub fn new(product_slug: &str, product_id: u64) -> Self {
        Self {
            product_slug: product_slug.to_string(),
            product_id,
            meta: None,
            volume: 1,
            extra: serde_json::Value::Null,
        }
    }

    /// Set the product metadata.
    pub fn with_meta(mut self, meta: &str) -> Self {
        self.meta = Some(meta.to_string());
        self
    }

    /// Set the volume.
    pub fn with_volume(mut self, volume: u32) -> Self {
        self.volume = volume;
        self
    }

    /// Set the extra data.
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }
}

/// A line item as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCartProduct {
    /// Server-assigned line item id.
    pub uuid: String,
    /// Product slug.
    pub product_slug: String,
    /// Numeric product id.
    pub product_id: u64,
    /// Display name.
    #[serde(default)]
    pub product_name: String,
    /// Product metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    /// Quantity.
    #[serde(default = "default_volume")]
    pub volume: u32,
    /// Free-form extra data.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
    /// Line subtotal in minor currency units.
    #[serde(default)]
    pub item_subtotal_integer: i64,
}

impl ResponseCartProduct {
    /// Build a provisional line item from a request product.
    ///
    /// Used for optimistic additions before the server assigns a real uuid
    /// and price.
    pub fn provisional(uuid: String, product: &RequestCartProduct) -> Self {
        Self {
            uuid,
            product_slug: product.product_slug.clone(),
            product_id: product.product_id,
            product_name: product.product_slug.clone(),
            meta: product.meta.clone(),
            volume: product.volume,
            extra: product.extra.clone(),
            item_subtotal_integer: 0,
        }
    }
}

impl From<&ResponseCartProduct> for RequestCartProduct {
    fn from(product: &ResponseCartProduct) -> Self {
        Self {
            product_slug: product.product_slug.clone(),
            product_id: product.product_id,
            meta: product.meta.clone(),
            volume: product.volume,
            extra: product.extra.clone(),
        }
    }
}

/// Postal/tax location attached to a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLocation {
    /// ISO country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// State/province code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivision_code: Option<String>,
}

impl CartLocation {
    /// Create a location with only a country.
    pub fn country(country_code: &str) -> Self {
        Self {
            country_code: Some(country_code.to_string()),
            ..Self::default()
        }
    }

    /// Set the postal code.
    pub fn with_postal_code(mut self, postal_code: &str) -> Self {
        self.postal_code = Some(postal_code.to_string());
        self
    }

    /// Set the subdivision code.
    pub fn with_subdivision(mut self, subdivision_code: &str) -> Self {
        self.subdivision_code = Some(subdivision_code.to_string());
        self
    }

    /// Check if any field differs from `other`.
    pub fn differs_from(&self, other: &CartLocation) -> bool {
        self != other
    }
}

/// Tax information on a response cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCartTax {
    /// The location taxes were computed for.
    #[serde(default)]
    pub location: CartLocation,
    /// Whether the UI should show a tax line.
    #[serde(default)]
    pub display_taxes: bool,
}

/// A message attached to a cart by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMessage {
    /// Machine-readable code, e.g. `invalid-coupon`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl CartMessage {
    /// Create a message.
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Validation and success messages returned with a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMessages {
    /// Field-level validation errors.
    #[serde(default)]
    pub errors: Vec<CartMessage>,
    /// Informational success messages.
    #[serde(default)]
    pub success: Vec<CartMessage>,
}

/// Server-authoritative cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCart {
    /// Line items, in server order.
    #[serde(default)]
    pub products: Vec<ResponseCartProduct>,
    /// Coupon code (empty when none).
    #[serde(default)]
    pub coupon: String,
    /// Whether the server accepted the coupon.
    #[serde(default)]
    pub is_coupon_applied: bool,
    /// Discount from the coupon, in minor units.
    #[serde(default)]
    pub coupon_discount_integer: i64,
    /// Sum of line subtotals, in minor units.
    #[serde(default)]
    pub sub_total_integer: i64,
    /// Tax, in minor units.
    #[serde(default)]
    pub total_tax_integer: i64,
    /// Grand total, in minor units.
    #[serde(default)]
    pub total_cost_integer: i64,
    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Tax location and display flag.
    #[serde(default)]
    pub tax: ResponseCartTax,
    /// Server messages.
    #[serde(default)]
    pub messages: CartMessages,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for ResponseCart {
    fn default() -> Self {
        Self::empty()
    }
}

impl ResponseCart {
    /// An empty cart, used before the first server response arrives.
    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            coupon: String::new(),
            is_coupon_applied: false,
            coupon_discount_integer: 0,
            sub_total_integer: 0,
            total_tax_integer: 0,
            total_cost_integer: 0,
            currency: default_currency(),
            tax: ResponseCartTax::default(),
            messages: CartMessages::default(),
        }
    }

    /// Check if the cart has a coupon code set (applied or not).
    pub fn has_coupon(&self) -> bool {
        !self.coupon.is_empty()
    }

    /// Find a line item by uuid.
    pub fn product(&self, uuid: &str) -> Option<&ResponseCartProduct> {
        self.products.iter().find(|p| p.uuid == uuid)
    }

    /// Check whether any line item has the given slug.
    pub fn contains_slug(&self, product_slug: &str) -> bool {
        self.products.iter().any(|p| p.product_slug == product_slug)
    }

    /// First server error message, if any.
    pub fn first_error(&self) -> Option<&CartMessage> {
        self.messages.errors.first()
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, CartTypesError> {
        serde_json::to_vec_pretty(self).map_err(CartTypesError::Serialization)
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CartTypesError> {
        serde_json::from_slice(bytes).map_err(CartTypesError::Deserialization)
    }
}

/// Tax section of a request cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCartTax {
    /// Location to compute taxes for.
    #[serde(default)]
    pub location: CartLocation,
}

/// Payload sent to `set_cart`.
///
/// Carries only what the client controls; totals, names and messages are
/// recomputed by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCart {
    /// Requested line items.
    #[serde(default)]
    pub products: Vec<RequestCartProduct>,
    /// Coupon code (empty when none).
    #[serde(default)]
    pub coupon: String,
    /// Whether the cart is a throwaway cart.
    #[serde(default)]
    pub temporary: bool,
    /// Tax location.
    #[serde(default)]
    pub tax: RequestCartTax,
}

impl RequestCart {
    /// Build a request cart from products and an optional coupon.
    pub fn from_additions(products: &[RequestCartProduct], coupon: Option<&str>) -> Self {
        Self {
            products: products.to_vec(),
            coupon: coupon.unwrap_or_default().to_string(),
            temporary: false,
            tax: RequestCartTax::default(),
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, CartTypesError> {
        serde_json::to_vec(self).map_err(CartTypesError::Serialization)
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CartTypesError> {
        serde_json::from_slice(bytes).map_err(CartTypesError::Deserialization)
    }
}

impl From<&ResponseCart> for RequestCart {
    fn from(cart: &ResponseCart) -> Self {
        Self {
            products: cart.products.iter().map(RequestCartProduct::from).collect(),
            coupon: cart.coupon.clone(),
            temporary: false,
            tax: RequestCartTax {
                location: cart.tax.location.clone(),
            },
        }
    }
}
