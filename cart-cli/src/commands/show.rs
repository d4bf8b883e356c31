//! Print the cart.

use anyhow::Result;
use cart_client::{CartConfig, CartSnapshot};
use cart_types::CouponStatus;
use std::path::Path;

/// Run the show command.
pub async fn run(data_dir: &Path, config: &CartConfig) -> Result<()> {
    let handle = super::open(data_dir, config).await?;
    let snapshot = super::finish(handle).await?;
    print_cart(&snapshot);
    Ok(())
}

/// Print a cart snapshot.
pub fn print_cart(snapshot: &CartSnapshot) {
    let cart = &snapshot.response_cart;
    let currency = cart.currency.as_str();

    println!("=== cart {} ({}) ===", snapshot.cart_key, snapshot.cache_status);

    if cart.products.is_empty() {
        println!("  (empty)");
    }
    for product in &cart.products {
        let meta = product
            .meta
            .as_deref()
            .map(|m| format!(" [{}]", m))
            .unwrap_or_default();
        println!(
            "  {:>3}  {}{} x{}  {}",
            product.uuid,
            product.product_name,
            meta,
            product.volume,
            format_amount(product.item_subtotal_integer, currency)
        );
    }

    println!();
    println!("  Subtotal: {}", format_amount(cart.sub_total_integer, currency));
    if cart.has_coupon() {
        println!(
            "  Coupon:   {} ({}) -{}",
            cart.coupon,
            snapshot.coupon_status,
            format_amount(cart.coupon_discount_integer, currency)
        );
    }
    if cart.tax.display_taxes {
        println!("  Tax:      {}", format_amount(cart.total_tax_integer, currency));
    }
    println!("  Total:    {}", format_amount(cart.total_cost_integer, currency));

    if let Some(country) = &cart.tax.location.country_code {
        let postal = cart.tax.location.postal_code.as_deref().unwrap_or("-");
        println!("  Location: {} {}", country, postal);
    }
    for message in &cart.messages.errors {
        println!("  ! {}", message.message);
    }
}

/// Report how a coupon submission ended.
pub fn print_coupon_status(snapshot: &CartSnapshot, code: &str) {
    match snapshot.coupon_status {
        CouponStatus::Applied => {}
        CouponStatus::Rejected => {
            let reason = snapshot
                .response_cart
                .first_error()
                .map(|m| m.message.as_str())
                .unwrap_or("not accepted");
            println!("Coupon {} rejected: {}", code, reason);
        }
        other => println!("Coupon {}: {}", code, other),
    }
}

/// Format minor currency units, e.g. `4800` as `48.00 USD`.
pub fn format_amount(amount: i64, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
}
