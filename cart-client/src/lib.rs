//! # cart-client
//!
//! Async shopping cart manager for cart-sync.
//!
//! This is the library applications use to keep a local cart in sync with
//! the server cart.
//!
//! ## Features
//!
//! - **Optimistic updates**: intents apply to the local cart immediately
//! - **Debounced revalidation**: bursts of intents become one server update
//! - **Store Abstraction**: Pluggable cart store (file, mock)
//! - **Pure State Machine**: Uses cart-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use cart_client::{FileCartStore, Catalog, ManagerConfig, ShoppingCartManager};
//!
//! let store = FileCartStore::new("/tmp/carts", Catalog::demo());
//! let handle = ShoppingCartManager::spawn(store, ManagerConfig::new("example.com"));
//!
//! handle.add_item(RequestCartProduct::new("plan-personal", 1009))?;
//! let snapshot = handle.settled().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod manager;
pub mod store;

pub use catalog::{Catalog, CatalogCoupon, CatalogProduct, TaxRate};
pub use config::{CartConfig, CartSection, ConfigError, RevalidationConfig};
pub use manager::{
    CartManagerHandle, CartSnapshot, CouponSuccessHook, EventListener, ManagerConfig,
    ManagerError, ShoppingCartManager,
};
pub use store::{CartStore, FileCartStore, MockCartStore, StoreError};
