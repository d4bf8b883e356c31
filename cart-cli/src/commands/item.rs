//! Add, remove and change line items.

use anyhow::Result;
use cart_client::CartConfig;
use cart_types::RequestCartProduct;
use std::path::Path;

use super::show::print_cart;

/// Run the add command.
pub async fn add(
    data_dir: &Path,
    config: &CartConfig,
    slug: &str,
    product_id: u64,
    meta: Option<&str>,
) -> Result<()> {
    let mut product = RequestCartProduct::new(slug, product_id);
    if let Some(meta) = meta {
        product = product.with_meta(meta);
    }

    let handle = super::open(data_dir, config).await?;
    println!("Adding {} ({})...", slug, product_id);
    handle.add_item(product)?;

    let snapshot = super::finish(handle).await?;
    print_cart(&snapshot);
    Ok(())
}

/// Run the remove command.
pub async fn remove(data_dir: &Path, config: &CartConfig, uuid: &str) -> Result<()> {
    let handle = super::open(data_dir, config).await?;
    if handle.snapshot().response_cart.product(uuid).is_none() {
        println!("No line item {} in the cart.", uuid);
    }
    handle.remove_item(uuid)?;

    let snapshot = super::finish(handle).await?;
    print_cart(&snapshot);
    Ok(())
}

/// Run the variant command.
pub async fn variant(
    data_dir: &Path,
    config: &CartConfig,
    uuid: &str,
    slug: &str,
    product_id: u64,
) -> Result<()> {
    let handle = super::open(data_dir, config).await?;
    if handle.snapshot().response_cart.product(uuid).is_none() {
        println!("No line item {} in the cart.", uuid);
    }
    handle.change_item_variant(uuid, slug, product_id)?;

    let snapshot = super::finish(handle).await?;
    print_cart(&snapshot);
    Ok(())
}
