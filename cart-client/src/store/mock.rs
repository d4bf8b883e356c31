//! Mock cart store for testing.
//!
//! Prices carts with a [`Catalog`], records every call and can be told to
//! fail or to answer slowly.

use super::{CartStore, StoreError};
use crate::catalog::Catalog;
use async_trait::async_trait;
use cart_types::{CartKey, RequestCart, ResponseCart};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock cart store for testing.
///
/// Clones share state, so a test can keep one handle while the manager
/// owns another.
#[derive(Debug, Default)]
pub struct MockCartStore {
    inner: Arc<Mutex<MockCartStoreInner>>,
}

#[derive(Debug, Default)]
struct MockCartStoreInner {
    catalog: Catalog,
    carts: HashMap<CartKey, ResponseCart>,
    get_calls: Vec<CartKey>,
    set_calls: Vec<(CartKey, RequestCart)>,
    fail_next_get: Option<String>,
    fail_next_set: Option<String>,
    delay: Duration,
    sets_in_flight: usize,
    max_sets_in_flight: usize,
}

impl MockCartStore {
    /// Create a mock store pricing with [`Catalog::demo`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store pricing with `catalog`.
    pub fn with_catalog(catalog: Catalog) -> Self {
        let store = Self::default();
        store.lock().catalog = catalog;
        store
    }

    fn lock(&self) -> MutexGuard<'_, MockCartStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a priced cart for `cart_key` as if it had been saved earlier.
    pub fn seed(&self, cart_key: &CartKey, cart: &RequestCart) -> ResponseCart {
        let mut inner = self.lock();
        let priced = inner.catalog.price(cart);
        inner.carts.insert(cart_key.clone(), priced.clone());
        priced
    }

    /// The stored cart for `cart_key`.
    pub fn stored(&self, cart_key: &CartKey) -> Option<ResponseCart> {
        self.lock().carts.get(cart_key).cloned()
    }

    /// Keys passed to `get_cart()`, in call order.
    pub fn get_calls(&self) -> Vec<CartKey> {
        self.lock().get_calls.clone()
    }

    /// Carts passed to `set_cart()`, in call order.
    pub fn set_calls(&self) -> Vec<(CartKey, RequestCart)> {
        self.lock().set_calls.clone()
    }

    /// The most `set_cart()` calls ever running at once.
    pub fn max_concurrent_sets(&self) -> usize {
        self.lock().max_sets_in_flight
    }

    /// Cause the next get_cart() to fail with the given error.
    pub fn fail_next_get(&self, error: &str) {
        self.lock().fail_next_get = Some(error.to_string());
    }

    /// Cause the next set_cart() to fail with the given error.
    pub fn fail_next_set(&self, error: &str) {
        self.lock().fail_next_set = Some(error.to_string());
    }

    /// Make every call take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay;
    }

    async fn wait(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Clone for MockCartStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl CartStore for MockCartStore {
    async fn get_cart(&self, cart_key: &CartKey) -> Result<ResponseCart, StoreError> {
        let (failure, delay) = {
            let mut inner = self.lock();
            inner.get_calls.push(cart_key.clone());
            (inner.fail_next_get.take(), inner.delay)
        };
        Self::wait(delay).await;

        if let Some(error) = failure {
            return Err(StoreError::Network(error));
        }

        let inner = self.lock();
        Ok(inner.carts.get(cart_key).cloned().unwrap_or_else(|| {
            let mut empty = ResponseCart::empty();
            empty.currency = inner.catalog.currency.clone();
            empty
        }))
    }

    async fn set_cart(
        &self,
        cart_key: &CartKey,
        cart: &RequestCart,
    ) -> Result<ResponseCart, StoreError> {
        let (failure, delay) = {
            let mut inner = self.lock();
            inner.set_calls.push((cart_key.clone(), cart.clone()));
            inner.sets_in_flight += 1;
            inner.max_sets_in_flight = inner.max_sets_in_flight.max(inner.sets_in_flight);
            (inner.fail_next_set.take(), inner.delay)
        };
        Self::wait(delay).await;

        let mut inner = self.lock();
        inner.sets_in_flight -= 1;

        if let Some(error) = failure {
            return Err(StoreError::Network(error));
        }

        let priced = inner.catalog.price(cart);
        inner.carts.insert(cart_key.clone(), priced.clone());
        Ok(priced)
    }
}
