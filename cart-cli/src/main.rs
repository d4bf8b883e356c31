//! # cart-cli
//!
//! CLI tool for managing cart-sync shopping carts.
//!
//! Carts are stored as JSON files under the data directory and priced with
//! the catalog from `cart.toml` (or a built-in demo catalog).
//!
//! ## Commands
//!
//! - `show`: Print the cart
//! - `add`: Add a product
//! - `remove`: Remove a line item
//! - `variant`: Swap a line item for another product
//! - `location`: Set the tax location
//! - `coupon`: Apply a coupon
//! - `remove-coupon`: Remove the coupon
//!
//! ## Example
//!
//! ```bash
//! cart-cli --key example.com add plan-personal 1009
//! cart-cli --key example.com coupon SAVE10
//! cart-cli --key example.com location --country US --postal-code 94110
//! cart-cli --key example.com show
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{coupon, item, location, show};

/// CLI tool for managing cart-sync shopping carts.
#[derive(Parser, Debug)]
#[command(name = "cart-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for stored carts and cart.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/cart.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cart key (site id or slug), overrides the config file
    #[arg(long, short, global = true)]
    key: Option<String>,

    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the cart
    Show,

    /// Add a product to the cart
    Add {
        /// Product slug
        slug: String,
        /// Product id
        product_id: u64,
        /// Product metadata (e.g. domain name)
        #[arg(long)]
        meta: Option<String>,
    },

    /// Remove a line item
    Remove {
        /// Line item uuid
        uuid: String,
    },

    /// Swap a line item for another product
    Variant {
        /// Line item uuid
        uuid: String,
        /// New product slug
        slug: String,
        /// New product id
        product_id: u64,
    },

    /// Set the tax location
    Location {
        /// Country code
        #[arg(long)]
        country: Option<String>,
        /// Postal code
        #[arg(long)]
        postal_code: Option<String>,
        /// State/province code
        #[arg(long)]
        subdivision: Option<String>,
    },

    /// Apply a coupon
    Coupon {
        /// Coupon code
        code: String,
    },

    /// Remove the coupon
    RemoveCoupon,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let mut cart_config = config::load(&data_dir, cli.config.as_deref())?;
    if let Some(key) = cli.key {
        cart_config.cart.key = Some(key);
    }
    tracing::debug!(
        data_dir = %data_dir.display(),
        cart_key = %cart_config.cart_key(),
        "Loaded configuration"
    );

    match cli.command {
        Commands::Show => show::run(&data_dir, &cart_config).await?,
        Commands::Add {
            slug,
            product_id,
            meta,
        } => item::add(&data_dir, &cart_config, &slug, product_id, meta.as_deref()).await?,
        Commands::Remove { uuid } => item::remove(&data_dir, &cart_config, &uuid).await?,
        Commands::Variant {
            uuid,
            slug,
            product_id,
        } => item::variant(&data_dir, &cart_config, &uuid, &slug, product_id).await?,
        Commands::Location {
            country,
            postal_code,
            subdivision,
        } => {
            location::run(
                &data_dir,
                &cart_config,
                country.as_deref(),
                postal_code.as_deref(),
                subdivision.as_deref(),
            )
            .await?
        }
        Commands::Coupon { code } => coupon::submit(&data_dir, &cart_config, &code).await?,
        Commands::RemoveCoupon => coupon::remove(&data_dir, &cart_config).await?,
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` when set.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for cart-cli.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "ydun", "cart-cli")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
