//! # cart-types
//!
//! Data model for cart-sync shopping cart synchronization.
//!
//! This crate provides the types shared by every cart-sync crate:
//! - [`CartKey`] - Which site/session cart is active
//! - [`ResponseCart`], [`RequestCart`] - Server snapshot and update payload
//! - [`CacheStatus`], [`CouponStatus`], [`VariantRequestStatus`] - Status tracking
//! - [`CartEvent`] - Notifications for external listeners
//! - [`CartTypesError`], [`CartError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cart;
mod error;
mod event;
mod ids;
mod status;

pub use cart::{
    CartLocation, CartMessage, CartMessages, RequestCart, RequestCartProduct, RequestCartTax,
    ResponseCart, ResponseCartProduct, ResponseCartTax,
};
pub use error::{CartError, CartErrorKind, CartTypesError};
pub use event::CartEvent;
pub use ids::CartKey;
pub use status::{CacheStatus, CouponStatus, VariantRequestStatus, VariantSelectOverride};
