//! Cart store abstraction for cart-sync.
//!
//! This module provides a pluggable store layer that abstracts where the
//! server-authoritative cart lives (a remote endpoint, a local file, an
//! in-memory mock for testing).
//!
//! # Design
//!
//! The store trait is async and keyed by [`CartKey`]:
//! - `get_cart()` loads the current cart (an empty cart if none exists)
//! - `set_cart()` replaces the cart and returns the validated result
//!
//! The store prices the cart, assigns line item uuids and reports
//! validation problems in the returned cart's messages. It never merges.
//!
//! # Example
//!
//! ```ignore
//! let store = MockCartStore::new();
//! let cart = store.get_cart(&CartKey::new("1234")).await?;
//! let updated = store.set_cart(&key, &RequestCart::from(&cart)).await?;
//! ```

mod file;
mod mock;

pub use file::FileCartStore;
pub use mock::MockCartStore;

use async_trait::async_trait;
use cart_types::{CartKey, CartTypesError, RequestCart, ResponseCart};
use thiserror::Error;

/// Cart store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The store answered with a failure.
    #[error("server error {status}: {message}")]
    Server {
        /// Status code.
        status: u16,
        /// Message returned by the server.
        message: String,
    },

    /// Local I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A cart could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] CartTypesError),
}

/// Store holding one server-authoritative cart per key.
///
/// Implementations must be safe to call concurrently; the manager never
/// has more than one call in flight per manager, but several managers may
/// share a store.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Load the cart for `cart_key`.
    ///
    /// A key with no stored cart yields an empty cart, not an error.
    async fn get_cart(&self, cart_key: &CartKey) -> Result<ResponseCart, StoreError>;

    /// Replace the cart for `cart_key` and return the validated cart.
    async fn set_cart(
        &self,
        cart_key: &CartKey,
        cart: &RequestCart,
    ) -> Result<ResponseCart, StoreError>;
}
