//! Configuration loading for cart-sync managers.
//!
//! Configuration is loaded from a TOML file (default: `cart.toml` in the
//! data directory). Every section and field is optional.

use cart_types::{CartKey, RequestCartProduct};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::Catalog;
use crate::manager::ManagerConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartConfig {
    /// Which cart to manage and what to seed it with.
    #[serde(default)]
    pub cart: CartSection,
    /// Revalidation timing.
    #[serde(default)]
    pub revalidation: RevalidationConfig,
    /// Products, coupons and tax rates (default: demo catalog).
    #[serde(default)]
    pub catalog: Catalog,
}

/// Cart configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CartSection {
    /// Cart key (site id or slug). Missing or empty means `no-site`.
    pub key: Option<String>,
    /// Whether the cart may be loaded (default: true).
    #[serde(default = "default_can_initialize")]
    pub can_initialize: bool,
    /// Coupon to put in a newly created cart.
    pub coupon_to_add: Option<String>,
    /// Products to put in a newly created cart.
    #[serde(default)]
    pub products_to_add: Vec<RequestCartProduct>,
}

/// Revalidation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RevalidationConfig {
    /// Debounce window in milliseconds (default: 300).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_can_initialize() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for CartSection {
    fn default() -> Self {
        Self {
            key: None,
            can_initialize: default_can_initialize(),
            coupon_to_add: None,
            products_to_add: Vec::new(),
        }
    }
}

impl Default for RevalidationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl CartConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The configured cart key.
    pub fn cart_key(&self) -> CartKey {
        CartKey::from_optional(self.cart.key.as_deref())
    }

    /// The debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.revalidation.debounce_ms)
    }

    /// Build the manager configuration described by this file.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            cart_key: self.cart_key(),
            can_initialize: self.cart.can_initialize,
            products_to_add: self.cart.products_to_add.clone(),
            coupon_to_add: self.cart.coupon_to_add.clone(),
            debounce: self.debounce(),
            ..ManagerConfig::default()
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = CartConfig::default();
        assert!(config.cart_key().is_no_site());
        assert!(config.cart.can_initialize);
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert!(config.catalog.product("plan-personal").is_some());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[cart]
key = "example.com"
coupon_to_add = "SAVE10"

[[cart.products_to_add]]
product_slug = "plan-premium"
product_id = 1003

[revalidation]
debounce_ms = 50

[catalog]
currency = "EUR"

[[catalog.products]]
product_slug = "plan-premium"
product_id = 1003
product_name = "Premium"
price_integer = 8000
"#;

        let config: CartConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cart_key().as_str(), "example.com");
        assert_eq!(config.cart.products_to_add[0].volume, 1);
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.catalog.currency, "EUR");

        let manager = config.manager_config();
        assert_eq!(manager.cart_key.as_str(), "example.com");
        assert_eq!(manager.coupon_to_add.as_deref(), Some("SAVE10"));
        assert_eq!(manager.products_to_add.len(), 1);
        assert_eq!(manager.debounce, Duration::from_millis(50));
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let toml = r#"
[cart]
[revalidation]
"#;
        let config: CartConfig = toml::from_str(toml).unwrap();
        assert!(config.cart.can_initialize);
        assert_eq!(config.revalidation.debounce_ms, 300);
        assert_eq!(config.catalog, Catalog::demo());
    }

    #[test]
    fn empty_key_means_no_site() {
        let config: CartConfig = toml::from_str("[cart]\nkey = \"\"\n").unwrap();
        assert!(config.cart_key().is_no_site());
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.toml");

        let err = CartConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("cart.toml"));

        std::fs::write(&path, "[revalidation]\ndebounce_ms = \"soon\"\n").unwrap();
        let err = CartConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        std::fs::write(&path, "[cart]\nkey = \"1234\"\n").unwrap();
        let config = CartConfig::from_file(&path).unwrap();
        assert_eq!(config.cart_key().as_str(), "1234");
    }
}
