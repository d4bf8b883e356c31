//! ShoppingCartManager - the main interface for cart-sync.
//!
//! This module provides [`ShoppingCartManager`], which keeps a local cart in
//! sync with a [`CartStore`], and [`CartManagerHandle`], the cheap cloneable
//! handle the application talks to.
//!
//! # Architecture
//!
//! The manager is an actor task that owns the pure state machine from
//! cart-core and interprets its effects to perform the actual I/O:
//!
//! ```text
//! Application → CartManagerHandle → actor → CartStore
//!                      ↑               ↓
//!                  snapshots      cart-core (pure state machine)
//! ```
//!
//! Every intent and every store completion goes through the actor, one at a
//! time, so actions apply in dispatch order and the state needs no locking.
//!
//! # Example
//!
//! ```ignore
//! use cart_client::{ManagerConfig, MockCartStore, ShoppingCartManager};
//!
//! let handle = ShoppingCartManager::spawn(MockCartStore::new(), ManagerConfig::new("1234"));
//! handle.add_item(RequestCartProduct::new("plan-personal", 1009))?;
//! let snapshot = handle.settled().await?;
//! ```

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cart_core::{CartAction, CartMutation, CartState, Debouncer, Effect, RequestId, DEFAULT_DEBOUNCE};
use cart_types::{
    CacheStatus, CartError, CartErrorKind, CartEvent, CartKey, CartLocation, CouponStatus,
    RequestCartProduct, ResponseCart, VariantRequestStatus, VariantSelectOverride,
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;

use crate::store::{CartStore, StoreError};

/// Manager errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// The manager task has stopped.
    #[error("cart manager is not running")]
    Closed,
}

/// Configuration for ShoppingCartManager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// The cart to manage first.
    pub cart_key: CartKey,
    /// Whether the cart may be loaded at all.
    pub can_initialize: bool,
    /// Products for a newly created cart. When set (or when a coupon is
    /// set) the manager creates the cart instead of loading it.
    pub products_to_add: Vec<RequestCartProduct>,
    /// Coupon for a newly created cart.
    pub coupon_to_add: Option<String>,
    /// Debounce window before revalidating.
    pub debounce: Duration,
    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cart_key: CartKey::default(),
            can_initialize: true,
            products_to_add: Vec::new(),
            coupon_to_add: None,
            debounce: DEFAULT_DEBOUNCE,
            event_capacity: 64,
        }
    }
}

impl ManagerConfig {
    /// Create a configuration that loads the cart for `cart_key`.
    pub fn new(cart_key: impl Into<CartKey>) -> Self {
        Self {
            cart_key: cart_key.into(),
            ..Self::default()
        }
    }

    /// Create the cart with these products.
    pub fn with_products_to_add(mut self, products: Vec<RequestCartProduct>) -> Self {
        self.products_to_add = products;
        self
    }

    /// Create the cart with this coupon.
    pub fn with_coupon_to_add(mut self, coupon: &str) -> Self {
        self.coupon_to_add = Some(coupon.to_string());
        self
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Allow or forbid loading the cart.
    pub fn with_can_initialize(mut self, can_initialize: bool) -> Self {
        self.can_initialize = can_initialize;
        self
    }

    fn initialize_action(&self) -> CartAction {
        CartAction::Initialize {
            can_initialize: self.can_initialize,
            products_to_add: self.products_to_add.clone(),
            coupon_to_add: self.coupon_to_add.clone(),
        }
    }
}

/// Read-only view of the manager state, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    /// The active cart key.
    pub cart_key: CartKey,
    /// The live cart, including optimistic mutations.
    pub response_cart: ResponseCart,
    /// Cache status.
    pub cache_status: CacheStatus,
    /// Coupon status.
    pub coupon_status: CouponStatus,
    /// Variant request status.
    pub variant_request_status: VariantRequestStatus,
    /// Variant overrides from `change_item_variant`.
    pub variant_select_override: Vec<VariantSelectOverride>,
    /// A coupon success message is waiting to be shown.
    pub should_show_coupon_notification: bool,
    /// The most recent store failure.
    pub last_error: Option<CartError>,
    /// Number of handle commands the manager has processed.
    pub applied_commands: u64,
}

impl CartSnapshot {
    fn capture(state: &CartState, applied_commands: u64) -> Self {
        Self {
            cart_key: state.cart_key().clone(),
            response_cart: state.response_cart().clone(),
            cache_status: state.cache_status(),
            coupon_status: state.coupon_status(),
            variant_request_status: state.variant_request_status(),
            variant_select_override: state.variant_select_override().to_vec(),
            should_show_coupon_notification: state.should_show_coupon_notification(),
            last_error: state.last_error().cloned(),
            applied_commands,
        }
    }

    /// Nothing has been loaded yet.
    pub fn is_loading(&self) -> bool {
        self.cache_status == CacheStatus::Fresh
    }

    /// Local cart is not confirmed by the server.
    pub fn is_pending_update(&self) -> bool {
        self.cache_status != CacheStatus::Valid
    }

    /// No server call is pending or scheduled.
    pub fn is_settled(&self) -> bool {
        matches!(self.cache_status, CacheStatus::Valid | CacheStatus::Error)
    }
}

/// Callback receiving every [`CartEvent`].
pub type EventListener = Arc<dyn Fn(&CartEvent) + Send + Sync>;

/// Callback receiving the cart a coupon was just applied to.
pub type CouponSuccessHook = Arc<dyn Fn(&ResponseCart) + Send + Sync>;

#[derive(Debug)]
enum Command {
    Mutate(CartMutation),
    SwitchCart(CartKey),
    Shutdown,
}

/// Builder for a cart manager task.
pub struct ShoppingCartManager<S> {
    store: Arc<S>,
    config: ManagerConfig,
    on_event: Option<EventListener>,
    on_coupon_success: Option<CouponSuccessHook>,
}

impl<S: CartStore + 'static> ShoppingCartManager<S> {
    /// Create a manager for `store`.
    pub fn new(store: S, config: ManagerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            on_event: None,
            on_coupon_success: None,
        }
    }

    /// Spawn a manager with no callbacks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: S, config: ManagerConfig) -> CartManagerHandle {
        Self::new(store, config).start()
    }

    /// Call `listener` for every event, right after the action producing it.
    ///
    /// A panicking listener is logged and otherwise ignored.
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: Fn(&CartEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(listener));
        self
    }

    /// Call `hook` when the server confirms a coupon.
    ///
    /// The notification flag is cleared once the hook returns.
    pub fn on_coupon_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ResponseCart) + Send + Sync + 'static,
    {
        self.on_coupon_success = Some(Arc::new(hook));
        self
    }

    /// Start the manager task and return its handle.
    ///
    /// Must be called from within a tokio runtime. The task stops on
    /// [`CartManagerHandle::shutdown`] or when every handle is dropped.
    pub fn start(self) -> CartManagerHandle {
        let state = CartState::new(self.config.cart_key.clone());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(CartSnapshot::capture(&state, 0));
        let (events_tx, _) = broadcast::channel(self.config.event_capacity.max(1));

        let actor = Actor {
            debouncer: Debouncer::new(self.config.debounce),
            store: self.store,
            config: self.config,
            state,
            origin: Instant::now(),
            applied_commands: 0,
            completions: completions_tx,
            snapshot: snapshot_tx,
            events: events_tx.clone(),
            on_event: self.on_event,
            on_coupon_success: self.on_coupon_success,
        };
        tokio::spawn(actor.run(commands_rx, completions_rx));

        CartManagerHandle {
            commands: commands_tx,
            sent: Arc::new(AtomicU64::new(0)),
            snapshot: snapshot_rx,
            events: events_tx,
        }
    }
}

/// Handle to a running cart manager.
///
/// Intents are queued and return immediately; store failures never surface
/// here, only through the snapshot's cache status and `last_error`.
#[derive(Debug, Clone)]
pub struct CartManagerHandle {
    commands: mpsc::UnboundedSender<Command>,
    sent: Arc<AtomicU64>,
    snapshot: watch::Receiver<CartSnapshot>,
    events: broadcast::Sender<CartEvent>,
}

impl CartManagerHandle {
    fn send(&self, command: Command) -> Result<(), ManagerError> {
        self.commands
            .send(command)
            .map_err(|_| ManagerError::Closed)?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn mutate(&self, mutation: CartMutation) -> Result<(), ManagerError> {
        self.send(Command::Mutate(mutation))
    }

    /// Append a product to the cart.
    pub fn add_item(&self, product: RequestCartProduct) -> Result<(), ManagerError> {
        self.mutate(CartMutation::AddItem(product))
    }

    /// Remove the line item with `uuid`.
    pub fn remove_item(&self, uuid: &str) -> Result<(), ManagerError> {
        self.mutate(CartMutation::RemoveItem {
            uuid: uuid.to_string(),
        })
    }

    /// Swap the line item with `uuid` for another product, in place.
    pub fn change_item_variant(
        &self,
        uuid: &str,
        new_product_slug: &str,
        new_product_id: u64,
    ) -> Result<(), ManagerError> {
        self.mutate(CartMutation::ReplaceItem {
            uuid: uuid.to_string(),
            new_product_slug: new_product_slug.to_string(),
            new_product_id,
        })
    }

    /// Set the tax location.
    pub fn update_location(&self, location: CartLocation) -> Result<(), ManagerError> {
        self.mutate(CartMutation::SetLocation(location))
    }

    /// Apply a coupon code.
    pub fn submit_coupon(&self, coupon: &str) -> Result<(), ManagerError> {
        self.mutate(CartMutation::AddCoupon(coupon.to_string()))
    }

    /// Remove the coupon.
    pub fn remove_coupon(&self) -> Result<(), ManagerError> {
        self.mutate(CartMutation::RemoveCoupon)
    }

    /// Make another cart key active and load it.
    ///
    /// Responses still in flight for the previous key are discarded.
    pub fn switch_cart(&self, cart_key: impl Into<CartKey>) -> Result<(), ManagerError> {
        self.send(Command::SwitchCart(cart_key.into()))
    }

    /// Stop the manager. Results of calls still in flight are dropped.
    pub fn shutdown(&self) -> Result<(), ManagerError> {
        self.send(Command::Shutdown)
    }

    /// Wait until the manager task has stopped.
    pub async fn closed(&self) {
        self.commands.closed().await
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Nothing has been loaded yet.
    pub fn is_loading(&self) -> bool {
        self.snapshot.borrow().is_loading()
    }

    /// Local cart is not confirmed by the server.
    pub fn is_pending_update(&self) -> bool {
        self.snapshot.borrow().is_pending_update()
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Wait for a snapshot matching `predicate`.
    ///
    /// Checks the current snapshot first.
    pub async fn wait_until<F>(&self, mut predicate: F) -> Result<CartSnapshot, ManagerError>
    where
        F: FnMut(&CartSnapshot) -> bool,
    {
        let mut snapshot = self.snapshot.clone();
        let current = snapshot
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| ManagerError::Closed)?;
        Ok(current.clone())
    }

    /// Wait until every command sent through this handle's clones so far
    /// has been processed and the cache is `Valid` or `Error`.
    ///
    /// Never resolves while initialization is not allowed.
    pub async fn settled(&self) -> Result<CartSnapshot, ManagerError> {
        let target = self.sent.load(Ordering::SeqCst);
        self.wait_until(|s| s.applied_commands >= target && s.is_settled())
            .await
    }
}

/// The task owning the state machine.
struct Actor<S> {
    store: Arc<S>,
    config: ManagerConfig,
    state: CartState,
    debouncer: Debouncer,
    origin: Instant,
    applied_commands: u64,
    completions: mpsc::UnboundedSender<CartAction>,
    snapshot: watch::Sender<CartSnapshot>,
    events: broadcast::Sender<CartEvent>,
    on_event: Option<EventListener>,
    on_coupon_success: Option<CouponSuccessHook>,
}

impl<S: CartStore + 'static> Actor<S> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<CartAction>,
    ) {
        tracing::debug!(cart_key = %self.state.cart_key(), "Cart manager started");
        let initialize = self.config.initialize_action();
        self.dispatch(initialize);

        loop {
            let timer = self.debouncer.pending();
            let deadline = timer.map_or_else(Instant::now, |(_, at)| self.origin + at);

            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.applied_commands += 1;
                    let stop = self.handle_command(command);
                    self.publish();
                    if stop {
                        break;
                    }
                }
                Some(action) = completions.recv() => self.dispatch(action),
                _ = tokio::time::sleep_until(deadline), if timer.is_some() => {
                    if let Some((token, _)) = timer {
                        if self.debouncer.fire(token, self.origin.elapsed()) {
                            self.dispatch(CartAction::RequestRevalidation);
                        }
                    }
                }
            }
        }

        tracing::debug!(cart_key = %self.state.cart_key(), "Cart manager stopped");
    }

    /// Returns true when the manager should stop.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Mutate(mutation) => self.dispatch(CartAction::Mutate(mutation)),
            Command::SwitchCart(cart_key) => self.switch_cart(cart_key),
            Command::Shutdown => return true,
        }
        false
    }

    fn switch_cart(&mut self, cart_key: CartKey) {
        if &cart_key == self.state.cart_key() {
            return;
        }
        tracing::info!(from = %self.state.cart_key(), to = %cart_key, "Switching cart");
        self.debouncer.cancel();
        self.dispatch(CartAction::SwitchCart { cart_key });
        // Initial additions belong to the first cart only.
        self.dispatch(CartAction::Initialize {
            can_initialize: self.config.can_initialize,
            products_to_add: Vec::new(),
            coupon_to_add: None,
        });
    }

    fn dispatch(&mut self, action: CartAction) {
        let before = self.state.cache_status();
        tracing::debug!(
            cart_key = %self.state.cart_key(),
            action = action_name(&action),
            "Dispatching cart action"
        );

        let (state, effects) = self.state.clone().on_action(action);
        self.state = state;

        if self.state.cache_status() != before {
            tracing::debug!(from = %before, to = %self.state.cache_status(), "Cache status changed");
        }
        let mut follow_ups = Vec::new();
        for effect in effects {
            follow_ups.extend(self.execute(effect));
        }
        for action in follow_ups {
            self.dispatch(action);
        }
        self.publish();
    }

    /// Returns an action to dispatch right after the current one.
    fn execute(&mut self, effect: Effect) -> Option<CartAction> {
        match effect {
            Effect::FetchCart {
                cart_key,
                request_id,
            } => {
                let store = Arc::clone(&self.store);
                self.spawn_request(async move {
                    match store.get_cart(&cart_key).await {
                        Ok(cart) => CartAction::ReceiveInitialResponseCart {
                            cart_key,
                            request_id,
                            cart,
                        },
                        Err(e) => store_failure(cart_key, request_id, CartErrorKind::GetServerCart, e),
                    }
                });
            }

            Effect::CreateCart {
                cart_key,
                request_id,
                cart,
            } => {
                let store = Arc::clone(&self.store);
                self.spawn_request(async move {
                    match store.set_cart(&cart_key, &cart).await {
                        Ok(cart) => CartAction::ReceiveInitialResponseCart {
                            cart_key,
                            request_id,
                            cart,
                        },
                        Err(e) => store_failure(cart_key, request_id, CartErrorKind::SetServerCart, e),
                    }
                });
            }

            Effect::SubmitCart {
                cart_key,
                request_id,
                cart,
            } => {
                let store = Arc::clone(&self.store);
                self.spawn_request(async move {
                    match store.set_cart(&cart_key, &cart).await {
                        Ok(cart) => CartAction::ReceiveUpdatedResponseCart {
                            cart_key,
                            request_id,
                            cart,
                        },
                        Err(e) => store_failure(cart_key, request_id, CartErrorKind::SetServerCart, e),
                    }
                });
            }

            Effect::ScheduleRevalidation => {
                self.debouncer.touch(self.origin.elapsed());
            }

            Effect::ShowCouponSuccess(cart) => {
                let hook = self.on_coupon_success.as_ref()?;
                if catch_unwind(AssertUnwindSafe(|| hook(&cart))).is_err() {
                    tracing::warn!("Coupon success hook panicked");
                }
                return Some(CartAction::CouponSuccessShown);
            }

            Effect::EmitEvent(event) => self.emit(event),
        }
        None
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = CartAction> + Send + 'static,
    {
        let completions = self.completions.clone();
        tokio::spawn(async move {
            // Fails only after shutdown, when the result is no longer wanted.
            let _ = completions.send(request.await);
        });
    }

    fn emit(&self, event: CartEvent) {
        tracing::debug!(event = event.event_type(), "Cart event");
        if let Some(listener) = &self.on_event {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::warn!(event = event.event_type(), "Cart event listener panicked");
            }
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        let next = CartSnapshot::capture(&self.state, self.applied_commands);
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

fn store_failure(
    cart_key: CartKey,
    request_id: RequestId,
    kind: CartErrorKind,
    error: StoreError,
) -> CartAction {
    tracing::warn!(
        cart_key = %cart_key,
        request = %request_id,
        kind = %kind,
        error = %error,
        "Cart store call failed"
    );
    CartAction::RaiseError {
        cart_key,
        request_id,
        kind,
        message: error.to_string(),
    }
}

fn action_name(action: &CartAction) -> &'static str {
    match action {
        CartAction::Initialize { .. } => "initialize",
        CartAction::Mutate(_) => "mutate",
        CartAction::RequestRevalidation => "request_revalidation",
        CartAction::ReceiveInitialResponseCart { .. } => "receive_initial_response_cart",
        CartAction::ReceiveUpdatedResponseCart { .. } => "receive_updated_response_cart",
        CartAction::RaiseError { .. } => "raise_error",
        CartAction::CouponSuccessShown => "coupon_success_shown",
        CartAction::SwitchCart { .. } => "switch_cart",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockCartStore;
    use cart_types::RequestCart;
    use std::sync::Mutex;

    fn key() -> CartKey {
        CartKey::new("1234")
    }

    fn personal_plan() -> RequestCartProduct {
        RequestCartProduct::new("plan-personal", 1009)
    }

    fn seeded_store(products: &[RequestCartProduct]) -> MockCartStore {
        let store = MockCartStore::new();
        store.seed(&key(), &RequestCart::from_additions(products, None));
        store
    }

    async fn idle() {
        tokio::time::sleep(Duration::from_secs(10)).await;
    }

    // ===========================================
    // Initialization
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn init_loads_existing_cart() {
        let store = seeded_store(&[RequestCartProduct::new("plan-premium", 1003)]);
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));

        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.cache_status, CacheStatus::Valid);
        assert!(!snapshot.is_loading());
        assert!(!snapshot.is_pending_update());
        assert!(snapshot.response_cart.contains_slug("plan-premium"));
        assert_eq!(store.get_calls(), vec![key()]);
        assert!(store.set_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn init_with_additions_creates_cart() {
        let store = MockCartStore::new();
        let config = ManagerConfig::new(key())
            .with_products_to_add(vec![personal_plan()])
            .with_coupon_to_add("SAVE10");
        let handle = ShoppingCartManager::spawn(store.clone(), config);

        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.cache_status, CacheStatus::Valid);
        assert_eq!(snapshot.coupon_status, CouponStatus::Applied);
        assert!(snapshot.response_cart.is_coupon_applied);
        assert!(store.get_calls().is_empty());
        assert_eq!(store.set_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn init_failure_sets_error() {
        let store = MockCartStore::new();
        store.fail_next_get("connection refused");
        let handle = ShoppingCartManager::spawn(store, ManagerConfig::new(key()));

        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.cache_status, CacheStatus::Error);
        assert!(!snapshot.is_loading());
        assert!(snapshot.is_pending_update());
        let error = snapshot.last_error.unwrap();
        assert_eq!(error.kind, CartErrorKind::GetServerCart);
        assert!(error.message.contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn init_waits_for_permission() {
        let store = MockCartStore::new();
        let config = ManagerConfig::new(key()).with_can_initialize(false);
        let handle = ShoppingCartManager::spawn(store.clone(), config);

        idle().await;
        assert!(handle.is_loading());
        assert!(store.get_calls().is_empty());
    }

    // ===========================================
    // Revalidation
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn add_item_goes_invalid_pending_valid() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();
        store.set_delay(Duration::from_millis(100));

        let start = Instant::now();
        handle.add_item(personal_plan()).unwrap();

        let snapshot = handle
            .wait_until(|s| s.cache_status == CacheStatus::Invalid)
            .await
            .unwrap();
        assert!(snapshot.response_cart.contains_slug("plan-personal"));

        handle
            .wait_until(|s| s.cache_status == CacheStatus::Pending)
            .await
            .unwrap();
        assert!(start.elapsed() >= DEFAULT_DEBOUNCE);
        assert_eq!(store.set_calls().len(), 1);

        let snapshot = handle
            .wait_until(|s| s.cache_status == CacheStatus::Valid)
            .await
            .unwrap();
        assert!(snapshot.response_cart.contains_slug("plan-personal"));
        assert_eq!(snapshot.response_cart.products[0].uuid, "0");
        assert_eq!(snapshot.response_cart.total_cost_integer, 4800);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_intents_sends_one_update() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        handle.add_item(personal_plan()).unwrap();
        handle
            .update_location(CartLocation::country("US").with_postal_code("94110"))
            .unwrap();
        handle.submit_coupon("SAVE10").unwrap();

        let snapshot = handle.settled().await.unwrap();
        let sets = store.set_calls();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].1.products.len(), 1);
        assert_eq!(sets[0].1.coupon, "SAVE10");
        assert_eq!(sets[0].1.tax.location.country_code.as_deref(), Some("US"));
        assert_eq!(snapshot.coupon_status, CouponStatus::Applied);
        assert!(snapshot.response_cart.tax.display_taxes);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_window_is_configurable() {
        let store = MockCartStore::new();
        let config = ManagerConfig::new(key()).with_debounce(Duration::from_secs(2));
        let handle = ShoppingCartManager::spawn(store.clone(), config);
        handle.settled().await.unwrap();

        let start = Instant::now();
        handle.add_item(personal_plan()).unwrap();
        handle.settled().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_update_in_flight() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();
        store.set_delay(Duration::from_secs(1));

        handle.add_item(personal_plan()).unwrap();
        handle
            .wait_until(|s| s.cache_status == CacheStatus::Pending)
            .await
            .unwrap();

        // Arrives while the first update is in flight
        handle
            .add_item(RequestCartProduct::new("domain_reg", 6).with_meta("example.com"))
            .unwrap();

        let snapshot = handle.settled().await.unwrap();
        assert_eq!(store.max_concurrent_sets(), 1);
        assert_eq!(store.set_calls().len(), 2);
        assert_eq!(snapshot.cache_status, CacheStatus::Valid);
        assert!(snapshot.response_cart.contains_slug("plan-personal"));
        assert!(snapshot.response_cart.contains_slug("domain_reg"));
    }

    #[tokio::test(start_paused = true)]
    async fn remove_during_pending_after_earlier_remove() {
        let store = seeded_store(&[
            RequestCartProduct::new("plan-premium", 1003),
            personal_plan(),
            RequestCartProduct::new("domain_reg", 6),
        ]);
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();
        store.set_delay(Duration::from_secs(1));

        handle.remove_item("0").unwrap();
        handle
            .wait_until(|s| s.cache_status == CacheStatus::Pending)
            .await
            .unwrap();
        // plan-personal is still "1" locally; the server is about to renumber it
        handle.remove_item("1").unwrap();

        let snapshot = handle.settled().await.unwrap();
        let slugs: Vec<_> = snapshot
            .response_cart
            .products
            .iter()
            .map(|p| p.product_slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["domain_reg"]);
        assert_eq!(store.set_calls().len(), 2);
        let stored = store.stored(&key()).unwrap();
        assert!(!stored.contains_slug("plan-personal"));
        assert!(stored.contains_slug("domain_reg"));
    }

    #[tokio::test(start_paused = true)]
    async fn remove_and_change_variant() {
        let store = seeded_store(&[personal_plan(), RequestCartProduct::new("domain_reg", 6)]);
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        handle.change_item_variant("0", "plan-personal-2y", 1029).unwrap();
        handle.remove_item("1").unwrap();

        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.response_cart.products.len(), 1);
        assert_eq!(snapshot.response_cart.products[0].product_slug, "plan-personal-2y");
        assert_eq!(snapshot.variant_request_status, VariantRequestStatus::Valid);
        assert_eq!(snapshot.variant_select_override[0].uuid, "0");
        assert_eq!(store.set_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn noop_intent_does_not_revalidate() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        handle.remove_item("no-such-item").unwrap();
        let snapshot = handle.settled().await.unwrap();
        idle().await;

        assert_eq!(snapshot.cache_status, CacheStatus::Valid);
        assert!(store.set_calls().is_empty());
    }

    // ===========================================
    // Coupons
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn submit_then_remove_coupon_leaves_no_coupon() {
        let store = seeded_store(&[personal_plan()]);
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        handle.submit_coupon("SAVE10").unwrap();
        handle.remove_coupon().unwrap();

        let snapshot = handle.settled().await.unwrap();
        assert!(!snapshot.response_cart.has_coupon());
        assert!(!snapshot.response_cart.is_coupon_applied);
        assert_eq!(snapshot.coupon_status, CouponStatus::Fresh);
        assert_eq!(store.set_calls().len(), 1);
        assert_eq!(store.set_calls()[0].1.coupon, "");
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_coupon_is_rejected_without_error() {
        let store = seeded_store(&[personal_plan()]);
        let handle = ShoppingCartManager::spawn(store, ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        handle.submit_coupon("BOGUS").unwrap();
        let snapshot = handle.settled().await.unwrap();

        assert_eq!(snapshot.cache_status, CacheStatus::Valid);
        assert_eq!(snapshot.coupon_status, CouponStatus::Rejected);
        assert!(snapshot.last_error.is_none());
        assert_eq!(
            snapshot.response_cart.first_error().map(|m| m.code.as_str()),
            Some("invalid-coupon")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn coupon_success_hook_runs_once() {
        let store = seeded_store(&[personal_plan()]);
        let shown = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&shown);
        let handle = ShoppingCartManager::new(store, ManagerConfig::new(key()))
            .on_coupon_success(move |cart| seen.lock().unwrap().push(cart.coupon.clone()))
            .start();
        handle.settled().await.unwrap();

        handle.submit_coupon("save10").unwrap();
        let snapshot = handle
            .wait_until(|s| s.coupon_status == CouponStatus::Applied && !s.should_show_coupon_notification)
            .await
            .unwrap();

        assert_eq!(snapshot.response_cart.coupon, "SAVE10");
        assert_eq!(*shown.lock().unwrap(), vec!["SAVE10".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn coupon_flag_clears_with_the_applying_response() {
        let store = seeded_store(&[personal_plan()]);
        let handle = ShoppingCartManager::new(store, ManagerConfig::new(key()))
            .on_coupon_success(|_| {})
            .start();
        handle.settled().await.unwrap();

        handle.submit_coupon("SAVE10").unwrap();
        let snapshot = handle
            .wait_until(|s| s.coupon_status == CouponStatus::Applied)
            .await
            .unwrap();
        assert!(!snapshot.should_show_coupon_notification);
    }

    #[tokio::test(start_paused = true)]
    async fn notification_flag_stays_without_hook() {
        let store = seeded_store(&[personal_plan()]);
        let handle = ShoppingCartManager::spawn(store, ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        handle.submit_coupon("SAVE10").unwrap();
        let snapshot = handle.settled().await.unwrap();
        assert!(snapshot.should_show_coupon_notification);
    }

    // ===========================================
    // Failures
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn intent_after_failed_load_keeps_server_cart() {
        let store = seeded_store(&[RequestCartProduct::new("plan-business", 1008)]);
        store.fail_next_get("offline");
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.cache_status, CacheStatus::Error);

        handle.update_location(CartLocation::country("US")).unwrap();
        let snapshot = handle.settled().await.unwrap();

        assert_eq!(snapshot.cache_status, CacheStatus::Valid);
        assert!(snapshot.response_cart.contains_slug("plan-business"));
        assert_eq!(store.get_calls().len(), 2);
        let stored = store.stored(&key()).unwrap();
        assert!(stored.contains_slug("plan-business"));
        assert_eq!(stored.tax.location.country_code.as_deref(), Some("US"));
    }

    #[tokio::test(start_paused = true)]
    async fn update_failure_keeps_local_cart() {
        let store = seeded_store(&[RequestCartProduct::new("plan-premium", 1003)]);
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        store.fail_next_set("gateway timeout");
        handle.add_item(personal_plan()).unwrap();
        handle.submit_coupon("SAVE10").unwrap();

        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.cache_status, CacheStatus::Error);
        assert_eq!(snapshot.coupon_status, CouponStatus::Error);
        assert!(snapshot.response_cart.contains_slug("plan-premium"));
        assert!(snapshot.response_cart.contains_slug("plan-personal"));
        assert_eq!(
            snapshot.last_error.map(|e| e.kind),
            Some(CartErrorKind::SetServerCart)
        );
        // Server cart untouched
        assert!(!store.stored(&key()).unwrap().contains_slug("plan-personal"));
    }

    #[tokio::test(start_paused = true)]
    async fn next_intent_after_failure_recovers() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        store.fail_next_set("offline");
        handle.add_item(personal_plan()).unwrap();
        assert_eq!(handle.settled().await.unwrap().cache_status, CacheStatus::Error);

        handle.update_location(CartLocation::country("US")).unwrap();
        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.cache_status, CacheStatus::Valid);
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.response_cart.contains_slug("plan-personal"));
    }

    // ===========================================
    // Events
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn listener_sees_events_in_order() {
        let store = MockCartStore::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let handle = ShoppingCartManager::new(store, ManagerConfig::new(key()))
            .on_event(move |event| sink.lock().unwrap().push(event.event_type()))
            .start();
        handle.settled().await.unwrap();

        handle.add_item(personal_plan()).unwrap();
        handle.submit_coupon("SAVE10").unwrap();
        handle.settled().await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "CART_INIT_START",
                "CART_INIT_COMPLETE",
                "CART_ADD_ITEM",
                "CART_COUPON_SUBMITTED",
                "CART_COUPON_APPLIED",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_listener_is_ignored() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::new(store, ManagerConfig::new(key()))
            .on_event(|_| panic!("listener bug"))
            .start();
        handle.settled().await.unwrap();

        handle.add_item(personal_plan()).unwrap();
        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.cache_status, CacheStatus::Valid);
        assert!(snapshot.response_cart.contains_slug("plan-personal"));
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_receive_events() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::spawn(store, ManagerConfig::new(key()));
        handle.settled().await.unwrap();
        let mut events = handle.subscribe();

        handle.add_item(personal_plan()).unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event, CartEvent::CartAddItem(personal_plan()));
    }

    // ===========================================
    // Key switching and shutdown
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn stale_response_after_switch_is_discarded() {
        let store = MockCartStore::new();
        let other = CartKey::new("5678");
        store.seed(
            &key(),
            &RequestCart::from_additions(&[RequestCartProduct::new("plan-business", 1008)], None),
        );
        store.seed(
            &other,
            &RequestCart::from_additions(&[RequestCartProduct::new("domain_reg", 6)], None),
        );
        store.set_delay(Duration::from_millis(500));

        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.switch_cart(other.clone()).unwrap();

        let snapshot = handle.settled().await.unwrap();
        assert_eq!(snapshot.cart_key, other);
        assert!(snapshot.response_cart.contains_slug("domain_reg"));
        assert!(!snapshot.response_cart.contains_slug("plan-business"));

        idle().await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.cart_key, other);
        assert!(!snapshot.response_cart.contains_slug("plan-business"));
        assert_eq!(store.get_calls(), vec![key(), other]);
    }

    #[tokio::test(start_paused = true)]
    async fn switch_to_active_key_is_noop() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::spawn(store.clone(), ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        handle.switch_cart(key()).unwrap();
        handle.settled().await.unwrap();
        assert_eq!(store.get_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_handle() {
        let store = MockCartStore::new();
        let handle = ShoppingCartManager::spawn(store, ManagerConfig::new(key()));
        handle.settled().await.unwrap();

        handle.shutdown().unwrap();
        handle.closed().await;

        assert_eq!(handle.add_item(personal_plan()), Err(ManagerError::Closed));
        let result = handle.wait_until(|s| s.cache_status == CacheStatus::Pending).await;
        assert_eq!(result, Err(ManagerError::Closed));
    }
}
