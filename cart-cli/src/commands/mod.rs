//! CLI command implementations.

pub mod coupon;
pub mod item;
pub mod location;
pub mod show;

use anyhow::{bail, Context, Result};
use cart_client::{
    CartConfig, CartManagerHandle, CartSnapshot, FileCartStore, ShoppingCartManager,
};
use cart_types::CacheStatus;
use std::path::Path;

use crate::config::carts_dir;

/// Start a manager on the file store and wait for the cart to load.
pub async fn open(data_dir: &Path, config: &CartConfig) -> Result<CartManagerHandle> {
    if !config.cart.can_initialize {
        bail!("Cart loading is disabled (cart.can_initialize = false)");
    }

    let store = FileCartStore::new(carts_dir(data_dir), config.catalog.clone());
    let handle = ShoppingCartManager::new(store, config.manager_config())
        .on_event(|event| tracing::info!(event = event.event_type(), "Cart event"))
        .on_coupon_success(|cart| println!("Coupon {} applied.", cart.coupon))
        .start();

    let snapshot = handle
        .settled()
        .await
        .context("Cart manager stopped while loading")?;
    if snapshot.cache_status == CacheStatus::Error {
        let reason = snapshot
            .last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Failed to load cart {}: {}", snapshot.cart_key, reason);
    }
    Ok(handle)
}

/// Wait for the last intent to be confirmed, then stop the manager.
pub async fn finish(handle: CartManagerHandle) -> Result<CartSnapshot> {
    let snapshot = handle
        .settled()
        .await
        .context("Cart manager stopped before the update finished")?;
    handle.shutdown()?;
    handle.closed().await;

    if snapshot.cache_status == CacheStatus::Error {
        show::print_cart(&snapshot);
        let reason = snapshot
            .last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Cart update failed: {}", reason);
    }
    Ok(snapshot)
}
