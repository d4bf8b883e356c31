//! File-backed cart store.
//!
//! Keeps one pretty-printed JSON [`ResponseCart`] per key under a data
//! directory. Writes go to a temp file first and are renamed into place.

use super::{CartStore, StoreError};
use crate::catalog::Catalog;
use async_trait::async_trait;
use cart_types::{CartKey, RequestCart, ResponseCart};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Cart store persisting carts as JSON files.
#[derive(Debug, Clone)]
pub struct FileCartStore {
    dir: PathBuf,
    catalog: Catalog,
}

impl FileCartStore {
    /// Create a store rooted at `dir`, pricing carts with `catalog`.
    ///
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, catalog: Catalog) -> Self {
        Self {
            dir: dir.into(),
            catalog,
        }
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the cart for `cart_key`.
    pub fn cart_path(&self, cart_key: &CartKey) -> PathBuf {
        self.dir.join(format!("cart-{}.json", cart_key.file_stem()))
    }
}

#[async_trait]
impl CartStore for FileCartStore {
    async fn get_cart(&self, cart_key: &CartKey) -> Result<ResponseCart, StoreError> {
        let path = self.cart_path(cart_key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(ResponseCart::from_json(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(cart_key = %cart_key, "No stored cart, starting empty");
                let mut empty = ResponseCart::empty();
                empty.currency = self.catalog.currency.clone();
                Ok(empty)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_cart(
        &self,
        cart_key: &CartKey,
        cart: &RequestCart,
    ) -> Result<ResponseCart, StoreError> {
        let priced = self.catalog.price(cart);
        let bytes = priced.to_json()?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.cart_path(cart_key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(
            cart_key = %cart_key,
            products = priced.products.len(),
            path = %path.display(),
            "Saved cart"
        );
        Ok(priced)
    }
}
