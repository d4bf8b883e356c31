//! Apply and remove coupons.

use anyhow::Result;
use cart_client::CartConfig;
use std::path::Path;

use super::show::{print_cart, print_coupon_status};

/// Run the coupon command.
pub async fn submit(data_dir: &Path, config: &CartConfig, code: &str) -> Result<()> {
    let handle = super::open(data_dir, config).await?;
    println!("Submitting coupon {}...", code);
    handle.submit_coupon(code)?;

    let snapshot = super::finish(handle).await?;
    print_coupon_status(&snapshot, code);
    print_cart(&snapshot);
    Ok(())
}

/// Run the remove-coupon command.
pub async fn remove(data_dir: &Path, config: &CartConfig) -> Result<()> {
    let handle = super::open(data_dir, config).await?;
    handle.remove_coupon()?;

    let snapshot = super::finish(handle).await?;
    print_cart(&snapshot);
    Ok(())
}
