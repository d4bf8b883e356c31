//! Product catalog and cart pricing.
//!
//! Stands in for the remote cart endpoint's business logic: turns a
//! [`RequestCart`] into the [`ResponseCart`] a server would return. Used by
//! [`MockCartStore`](crate::MockCartStore) and
//! [`FileCartStore`](crate::FileCartStore).

use cart_types::{
    CartMessage, RequestCart, ResponseCart, ResponseCartProduct, ResponseCartTax,
};
use serde::{Deserialize, Serialize};

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Product slug.
    pub product_slug: String,
    /// Numeric product id.
    pub product_id: u64,
    /// Display name.
    pub product_name: String,
    /// Unit price in minor currency units.
    pub price_integer: i64,
}

/// A coupon the server accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCoupon {
    /// Coupon code (matched case-insensitively).
    pub code: String,
    /// Discount in percent of the subtotal.
    pub percent_off: u8,
}

/// Tax rate for a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    /// ISO country code.
    pub country_code: String,
    /// Rate in basis points (825 = 8.25%).
    pub basis_points: u32,
}

/// Products, coupons and tax rates used to price carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// ISO currency code for every price.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Known products.
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
    /// Valid coupons.
    #[serde(default)]
    pub coupons: Vec<CatalogCoupon>,
    /// Tax rates by country.
    #[serde(default)]
    pub tax_rates: Vec<TaxRate>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for Catalog {
    fn default() -> Self {
        Self::demo()
    }
}

impl Catalog {
    /// A small catalog of plans and domains for demos and tests.
    pub fn demo() -> Self {
        let product = |slug: &str, id: u64, name: &str, price: i64| CatalogProduct {
            product_slug: slug.to_string(),
            product_id: id,
            product_name: name.to_string(),
            price_integer: price,
        };
        Self {
            currency: default_currency(),
            products: vec![
                product("plan-personal", 1009, "WordPress.com Personal", 4800),
                product("plan-personal-2y", 1029, "WordPress.com Personal (2 years)", 8400),
                product("plan-premium", 1003, "WordPress.com Premium", 9600),
                product("plan-business", 1008, "WordPress.com Business", 30000),
                product("domain_reg", 6, "Domain Registration", 1800),
            ],
            coupons: vec![
                CatalogCoupon {
                    code: "SAVE10".to_string(),
                    percent_off: 10,
                },
                CatalogCoupon {
                    code: "HALFOFF".to_string(),
                    percent_off: 50,
                },
            ],
            tax_rates: vec![TaxRate {
                country_code: "US".to_string(),
                basis_points: 825,
            }],
        }
    }

    /// Look up a product by slug.
    pub fn product(&self, product_slug: &str) -> Option<&CatalogProduct> {
        self.products.iter().find(|p| p.product_slug == product_slug)
    }

    /// Look up a coupon by code, ignoring case.
    pub fn coupon(&self, code: &str) -> Option<&CatalogCoupon> {
        self.coupons
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }

    fn tax_rate(&self, country_code: Option<&str>) -> Option<u32> {
        let country = country_code?;
        self.tax_rates
            .iter()
            .find(|r| r.country_code.eq_ignore_ascii_case(country))
            .map(|r| r.basis_points)
    }

    /// Price a request cart.
    ///
    /// Line items get index-based uuids. Unknown products are kept at price
    /// zero. An unknown coupon is dropped and reported in
    /// `messages.errors` with code `invalid-coupon`.
    pub fn price(&self, request: &RequestCart) -> ResponseCart {
        let mut cart = ResponseCart::empty();
        cart.currency = self.currency.clone();

        for (index, item) in request.products.iter().enumerate() {
            let known = self.product(&item.product_slug);
            let unit_price = known.map(|p| p.price_integer).unwrap_or(0);
            cart.products.push(ResponseCartProduct {
                uuid: index.to_string(),
                product_slug: item.product_slug.clone(),
                product_id: item.product_id,
                product_name: known
                    .map(|p| p.product_name.clone())
                    .unwrap_or_else(|| item.product_slug.clone()),
                meta: item.meta.clone(),
                volume: item.volume,
                extra: item.extra.clone(),
                item_subtotal_integer: unit_price * i64::from(item.volume),
            });
        }
        cart.sub_total_integer = cart.products.iter().map(|p| p.item_subtotal_integer).sum();

        if !request.coupon.is_empty() {
            match self.coupon(&request.coupon) {
                Some(coupon) => {
                    cart.coupon = coupon.code.clone();
                    cart.is_coupon_applied = true;
                    cart.coupon_discount_integer =
                        cart.sub_total_integer * i64::from(coupon.percent_off) / 100;
                }
                None => cart.messages.errors.push(CartMessage::new(
                    "invalid-coupon",
                    &format!("Coupon code \"{}\" is not valid.", request.coupon),
                )),
            }
        }

        let location = request.tax.location.clone();
        let rate = self.tax_rate(location.country_code.as_deref());
        let taxable = cart.sub_total_integer - cart.coupon_discount_integer;
        cart.total_tax_integer = rate.map_or(0, |bp| taxable * i64::from(bp) / 10_000);
        cart.tax = ResponseCartTax {
            location,
            display_taxes: rate.is_some(),
        };
        cart.total_cost_integer = taxable + cart.total_tax_integer;

        cart
    }
}
