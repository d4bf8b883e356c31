//! Configuration management for cart-cli.

use anyhow::{Context, Result};
use cart_client::CartConfig;
use std::path::{Path, PathBuf};

/// Config file looked up in the data directory.
pub const CONFIG_FILE: &str = "cart.toml";

/// Load the cart configuration.
///
/// An explicit path must exist. Otherwise `<data_dir>/cart.toml` is used
/// when present, and the defaults when not.
pub fn load(data_dir: &Path, explicit: Option<&Path>) -> Result<CartConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = data_dir.join(CONFIG_FILE);
            if !path.exists() {
                return Ok(CartConfig::default());
            }
            path
        }
    };

    CartConfig::from_file(&path)
        .with_context(|| format!("Invalid cart configuration in {}", path.display()))
}

/// Directory holding one JSON file per cart key.
pub fn carts_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("carts")
}
