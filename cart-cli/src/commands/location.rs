//! Set the tax location.

use anyhow::{bail, Result};
use cart_client::CartConfig;
use cart_types::CartLocation;
use std::path::Path;

use super::show::print_cart;

/// Run the location command.
///
/// Fields left out keep their current value.
pub async fn run(
    data_dir: &Path,
    config: &CartConfig,
    country: Option<&str>,
    postal_code: Option<&str>,
    subdivision: Option<&str>,
) -> Result<()> {
    if country.is_none() && postal_code.is_none() && subdivision.is_none() {
        bail!("Specify at least one of --country, --postal-code, --subdivision");
    }

    let handle = super::open(data_dir, config).await?;
    let current = handle.snapshot().response_cart.tax.location;
    let location = merge_location(current, country, postal_code, subdivision);
    handle.update_location(location)?;

    let snapshot = super::finish(handle).await?;
    print_cart(&snapshot);
    Ok(())
}

fn merge_location(
    current: CartLocation,
    country: Option<&str>,
    postal_code: Option<&str>,
    subdivision: Option<&str>,
) -> CartLocation {
    let pick = |new: Option<&str>, old: Option<String>| new.map(str::to_string).or(old);
    CartLocation {
        country_code: pick(country, current.country_code),
        postal_code: pick(postal_code, current.postal_code),
        subdivision_code: pick(subdivision, current.subdivision_code),
    }
}
