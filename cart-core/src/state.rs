//! Cart cache-status state machine.
//!
//! [`CartState`] is a pure, side-effect-free state machine for one active
//! cart. It takes [`CartAction`]s as input and produces a new state plus a
//! list of [`Effect`]s to execute.
//!
//! The actual I/O (fetching and sending carts, timers, notifying listeners)
//! is performed by cart-client, not by this module.
//!
//! ```text
//! fresh ──init ok──▶ valid ──mutation──▶ invalid ──debounce──▶ pending
//!   │                  ▲                                         │
//!   └──init err──▶ error ◀──────────────── err ──────────────────┤
//!                      ▲                                         │
//!                      └───────────────── ok (valid) ◀───────────┘
//! ```
//!
//! An intent arriving in error before any cart was loaded goes back to
//! fresh and loads the cart again rather than sending the local cart.

use cart_types::{
    CacheStatus, CartError, CartErrorKind, CartEvent, CartKey, CouponStatus, RequestCart,
    RequestCartProduct, ResponseCart, VariantRequestStatus, VariantSelectOverride,
};
use std::collections::HashMap;
use std::fmt;

use crate::mutation::{self, CartMutation};

/// Prefix of the uuids given to items added locally.
const PROVISIONAL_UUID_PREFIX: &str = "pending-item-";

/// Identifies one server call issued by the state machine.
///
/// Ids are never reused for the lifetime of a state machine, including
/// across cart key switches, so a late response can always be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Create a request id from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// First activation: load the server cart or create one from additions.
    Initialize {
        /// Whether the cart may be loaded at all (e.g. user is logged in).
        can_initialize: bool,
        /// Products to put in a newly created cart.
        products_to_add: Vec<RequestCartProduct>,
        /// Coupon to put in a newly created cart.
        coupon_to_add: Option<String>,
    },
    /// A UI intent.
    Mutate(CartMutation),
    /// The debounce timer fired.
    RequestRevalidation,
    /// Response to `FetchCart` or `CreateCart`.
    ReceiveInitialResponseCart {
        /// Key the request was made for.
        cart_key: CartKey,
        /// Request being answered.
        request_id: RequestId,
        /// The server cart.
        cart: ResponseCart,
    },
    /// Response to `SubmitCart`.
    ReceiveUpdatedResponseCart {
        /// Key the request was made for.
        cart_key: CartKey,
        /// Request being answered.
        request_id: RequestId,
        /// The server cart.
        cart: ResponseCart,
    },
    /// A server call failed.
    RaiseError {
        /// Key the request was made for.
        cart_key: CartKey,
        /// Request that failed.
        request_id: RequestId,
        /// Which call failed.
        kind: CartErrorKind,
        /// Error message.
        message: String,
    },
    /// The coupon success message was shown.
    CouponSuccessShown,
    /// Make another cart key active.
    SwitchCart {
        /// The new key.
        cart_key: CartKey,
    },
}

/// Effects to be executed by cart-client.
///
/// These are instructions, not side effects. The driver interprets these
/// and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Load the existing server cart.
    FetchCart {
        /// Cart to load.
        cart_key: CartKey,
        /// Id to tag the response with.
        request_id: RequestId,
    },
    /// Create the server cart from initial additions.
    CreateCart {
        /// Cart to write.
        cart_key: CartKey,
        /// Id to tag the response with.
        request_id: RequestId,
        /// Initial contents.
        cart: RequestCart,
    },
    /// Send the full local cart for revalidation.
    SubmitCart {
        /// Cart to write.
        cart_key: CartKey,
        /// Id to tag the response with.
        request_id: RequestId,
        /// Full local cart.
        cart: RequestCart,
    },
    /// (Re)arm the debounce timer.
    ScheduleRevalidation,
    /// Show the coupon success message for this cart.
    ShowCouponSuccess(ResponseCart),
    /// Emit an event to the application.
    EmitEvent(CartEvent),
}

/// A mutation waiting to be replayed onto the next server response.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedMutation {
    mutation: CartMutation,
    /// Uuid given to an added item, reused on replay so later intents
    /// referring to it still match.
    provisional_uuid: Option<String>,
}

impl QueuedMutation {
    /// Rewrite the line item this mutation targets into the uuids of a new
    /// server cart. Returns None if that item no longer exists there.
    fn renamed(self, renames: &HashMap<String, String>) -> Option<Self> {
        let mutation = match self.mutation {
            CartMutation::RemoveItem { uuid } => CartMutation::RemoveItem {
                uuid: rename(renames, uuid)?,
            },
            CartMutation::ReplaceItem {
                uuid,
                new_product_slug,
                new_product_id,
            } => CartMutation::ReplaceItem {
                uuid: rename(renames, uuid)?,
                new_product_slug,
                new_product_id,
            },
            other => other,
        };
        Some(Self { mutation, ..self })
    }
}

/// Map an old line item uuid to its new one. Provisional uuids that were
/// never sent keep their name.
fn rename(renames: &HashMap<String, String>, uuid: String) -> Option<String> {
    match renames.get(&uuid) {
        Some(new_uuid) => Some(new_uuid.clone()),
        None if uuid.starts_with(PROVISIONAL_UUID_PREFIX) => Some(uuid),
        None => None,
    }
}

/// Pair each submitted line item with the response item that answers it.
///
/// The server may renumber line items and drop unknown ones but keeps
/// their order, so items are matched in order by product id.
fn line_item_renames(
    submitted: &[(String, u64)],
    cart: &ResponseCart,
) -> HashMap<String, String> {
    let mut renames = HashMap::new();
    let mut next = 0;
    for (uuid, product_id) in submitted {
        let found = cart.products[next..]
            .iter()
            .position(|p| p.product_id == *product_id);
        if let Some(offset) = found {
            renames.insert(uuid.clone(), cart.products[next + offset].uuid.clone());
            next += offset + 1;
        }
    }
    renames
}

/// State of one active cart. NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartState {
    cart_key: CartKey,
    response_cart: ResponseCart,
    cache_status: CacheStatus,
    coupon_status: CouponStatus,
    variant_request_status: VariantRequestStatus,
    variant_select_override: Vec<VariantSelectOverride>,
    should_show_coupon_notification: bool,
    last_error: Option<CartError>,
    init_requested: bool,
    initialized: bool,
    in_flight: Option<RequestId>,
    next_request_id: u64,
    next_provisional_id: u64,
    queued: Vec<QueuedMutation>,
    /// Line items (uuid, product id) of the cart in flight.
    submitted: Vec<(String, u64)>,
    /// Contents for a created cart; None loads the existing one.
    initial_cart: Option<RequestCart>,
}

impl CartState {
    /// Create a state machine for `cart_key` in the Fresh state.
    pub fn new(cart_key: CartKey) -> Self {
        Self {
            cart_key,
            response_cart: ResponseCart::empty(),
            cache_status: CacheStatus::Fresh,
            coupon_status: CouponStatus::Fresh,
            variant_request_status: VariantRequestStatus::Fresh,
            variant_select_override: Vec::new(),
            should_show_coupon_notification: false,
            last_error: None,
            init_requested: false,
            initialized: false,
            in_flight: None,
            next_request_id: 0,
            next_provisional_id: 0,
            queued: Vec::new(),
            submitted: Vec::new(),
            initial_cart: None,
        }
    }

    /// Process an action and return the new state plus effects to execute.
    ///
    /// This is a pure function - no side effects. The caller (cart-client)
    /// is responsible for executing the returned effects.
    pub fn on_action(mut self, action: CartAction) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();

        match action {
            CartAction::Initialize {
                can_initialize,
                products_to_add,
                coupon_to_add,
            } => self.initialize(can_initialize, products_to_add, coupon_to_add, &mut effects),

            CartAction::Mutate(mutation) => self.mutate(mutation, &mut effects),

            CartAction::RequestRevalidation => self.request_revalidation(&mut effects),

            CartAction::ReceiveInitialResponseCart {
                cart_key,
                request_id,
                cart,
            } => {
                if self.accept(&cart_key, request_id) {
                    self.initialized = true;
                    effects.push(Effect::EmitEvent(CartEvent::CartInitComplete));
                    self.receive(cart, &mut effects);
                }
            }

            CartAction::ReceiveUpdatedResponseCart {
                cart_key,
                request_id,
                cart,
            } => {
                if self.accept(&cart_key, request_id) {
                    self.receive(cart, &mut effects);
                }
            }

            CartAction::RaiseError {
                cart_key,
                request_id,
                kind,
                message,
            } => {
                if self.accept(&cart_key, request_id) {
                    self.fail(kind, message, &mut effects);
                }
            }

            CartAction::CouponSuccessShown => {
                self.should_show_coupon_notification = false;
            }

            CartAction::SwitchCart { cart_key } => {
                if cart_key != self.cart_key {
                    self = Self {
                        next_request_id: self.next_request_id,
                        next_provisional_id: self.next_provisional_id,
                        ..Self::new(cart_key)
                    };
                }
            }
        }

        (self, effects)
    }

    /// The active cart key.
    pub fn cart_key(&self) -> &CartKey {
        &self.cart_key
    }

    /// The live cart, including optimistic mutations.
    pub fn response_cart(&self) -> &ResponseCart {
        &self.response_cart
    }

    /// Current cache status.
    pub fn cache_status(&self) -> CacheStatus {
        self.cache_status
    }

    /// Current coupon status.
    pub fn coupon_status(&self) -> CouponStatus {
        self.coupon_status
    }

    /// Current variant request status.
    pub fn variant_request_status(&self) -> VariantRequestStatus {
        self.variant_request_status
    }

    /// Variant overrides from `change_item_variant`.
    pub fn variant_select_override(&self) -> &[VariantSelectOverride] {
        &self.variant_select_override
    }

    /// Whether a coupon success message is waiting to be shown.
    pub fn should_show_coupon_notification(&self) -> bool {
        self.should_show_coupon_notification
    }

    /// The most recent server failure.
    pub fn last_error(&self) -> Option<&CartError> {
        self.last_error.as_ref()
    }

    /// The server call currently in flight, if any.
    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// Number of mutations waiting to be replayed.
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Nothing has been loaded yet.
    pub fn is_loading(&self) -> bool {
        self.cache_status == CacheStatus::Fresh
    }

    /// Local cart is not confirmed by the server.
    pub fn is_pending_update(&self) -> bool {
        self.cache_status != CacheStatus::Valid
    }

    fn allocate_request(&mut self) -> RequestId {
        self.next_request_id += 1;
        let id = RequestId(self.next_request_id);
        self.in_flight = Some(id);
        id
    }

    fn initialize(
        &mut self,
        can_initialize: bool,
        products_to_add: Vec<RequestCartProduct>,
        coupon_to_add: Option<String>,
        effects: &mut Vec<Effect>,
    ) {
        if self.cache_status != CacheStatus::Fresh || self.init_requested || !can_initialize {
            return;
        }
        self.init_requested = true;

        let coupon_to_add = coupon_to_add.filter(|c| !c.is_empty());
        if !products_to_add.is_empty() || coupon_to_add.is_some() {
            self.initial_cart = Some(RequestCart::from_additions(
                &products_to_add,
                coupon_to_add.as_deref(),
            ));
        }
        self.load(effects);
    }

    /// Issue the initial server call: create the cart from the initial
    /// additions, or fetch it when there are none.
    fn load(&mut self, effects: &mut Vec<Effect>) {
        let cart_key = self.cart_key.clone();
        let request_id = self.allocate_request();
        self.cache_status = CacheStatus::Fresh;
        self.submitted.clear();
        effects.push(Effect::EmitEvent(CartEvent::CartInitStart));

        match &self.initial_cart {
            None => effects.push(Effect::FetchCart {
                cart_key,
                request_id,
            }),
            Some(cart) => {
                if !cart.coupon.is_empty() {
                    self.coupon_status = CouponStatus::Pending;
                }
                effects.push(Effect::CreateCart {
                    cart_key,
                    request_id,
                    cart: cart.clone(),
                });
            }
        }
    }

    fn mutate(&mut self, mutation: CartMutation, effects: &mut Vec<Effect>) {
        let provisional_uuid = match mutation {
            CartMutation::AddItem(_) => {
                self.next_provisional_id += 1;
                Some(format!("{}{}", PROVISIONAL_UUID_PREFIX, self.next_provisional_id))
            }
            _ => None,
        };
        let queued = QueuedMutation {
            mutation,
            provisional_uuid,
        };

        if !self.apply(&queued) {
            return;
        }
        if let Some(event) = queued.mutation.intent_event() {
            effects.push(Effect::EmitEvent(event));
        }

        match self.cache_status {
            // A server response is outstanding; replay onto it when it lands.
            CacheStatus::Fresh | CacheStatus::Pending => self.queued.push(queued),
            // The server cart was never loaded, so sending the local cart
            // would overwrite it. Load it again and replay onto it.
            CacheStatus::Error if !self.initialized => {
                self.queued.push(queued);
                self.load(effects);
            }
            CacheStatus::Valid | CacheStatus::Invalid | CacheStatus::Error => {
                self.cache_status = CacheStatus::Invalid;
                effects.push(Effect::ScheduleRevalidation);
            }
        }
    }

    /// Apply a mutation to the local cart and the statuses it drives.
    /// Returns false if nothing changed.
    fn apply(&mut self, queued: &QueuedMutation) -> bool {
        let cart = &mut self.response_cart;
        match &queued.mutation {
            CartMutation::AddItem(product) => {
                let uuid = queued.provisional_uuid.as_deref().unwrap_or_default();
                mutation::add_item(cart, uuid, product);
                true
            }
            CartMutation::RemoveItem { uuid } => {
                if !mutation::remove_item(cart, uuid) {
                    return false;
                }
                self.variant_select_override.retain(|o| &o.uuid != uuid);
                true
            }
            CartMutation::ReplaceItem {
                uuid,
                new_product_slug,
                new_product_id,
            } => {
                if !mutation::replace_item(cart, uuid, new_product_slug, *new_product_id) {
                    return false;
                }
                self.variant_request_status = VariantRequestStatus::Pending;
                self.variant_select_override.retain(|o| &o.uuid != uuid);
                self.variant_select_override.push(VariantSelectOverride {
                    uuid: uuid.clone(),
                    override_selected_product_slug: new_product_slug.clone(),
                });
                true
            }
            CartMutation::SetLocation(location) => mutation::set_location(cart, location),
            CartMutation::AddCoupon(coupon) => {
                if self.coupon_status == CouponStatus::Applied && &cart.coupon == coupon {
                    return false;
                }
                mutation::add_coupon(cart, coupon);
                self.coupon_status = CouponStatus::Pending;
                true
            }
            CartMutation::RemoveCoupon => {
                mutation::remove_coupon(cart);
                self.coupon_status = CouponStatus::Fresh;
                self.should_show_coupon_notification = false;
                true
            }
        }
    }

    fn request_revalidation(&mut self, effects: &mut Vec<Effect>) {
        if self.cache_status != CacheStatus::Invalid {
            return;
        }
        let cart_key = self.cart_key.clone();
        let request_id = self.allocate_request();
        self.cache_status = CacheStatus::Pending;
        self.submitted = self
            .response_cart
            .products
            .iter()
            .map(|p| (p.uuid.clone(), p.product_id))
            .collect();
        effects.push(Effect::SubmitCart {
            cart_key,
            request_id,
            cart: RequestCart::from(&self.response_cart),
        });
    }

    /// Accept a response only if it answers the call in flight for the
    /// active key.
    fn accept(&mut self, cart_key: &CartKey, request_id: RequestId) -> bool {
        if cart_key != &self.cart_key || self.in_flight != Some(request_id) {
            return false;
        }
        self.in_flight = None;
        true
    }

    fn receive(&mut self, cart: ResponseCart, effects: &mut Vec<Effect>) {
        // Queued intents and overrides name line items by local uuid; move
        // them to the uuids the server just assigned.
        let renames = line_item_renames(&std::mem::take(&mut self.submitted), &cart);
        self.queued = std::mem::take(&mut self.queued)
            .into_iter()
            .filter_map(|q| q.renamed(&renames))
            .collect();
        self.variant_select_override = std::mem::take(&mut self.variant_select_override)
            .into_iter()
            .filter_map(|o| {
                Some(VariantSelectOverride {
                    uuid: rename(&renames, o.uuid)?,
                    ..o
                })
            })
            .collect();

        let submitted_coupon = std::mem::take(&mut self.response_cart.coupon);
        self.response_cart = cart;
        self.last_error = None;

        let coupon_queued = self.queued.iter().any(|q| q.mutation.touches_coupon());
        if self.coupon_status == CouponStatus::Pending && !coupon_queued {
            self.reconcile_coupon(submitted_coupon, effects);
        }

        let variant_queued = self.queued.iter().any(|q| q.mutation.touches_variant());
        if self.variant_request_status == VariantRequestStatus::Pending && !variant_queued {
            self.variant_request_status = VariantRequestStatus::Valid;
        }

        self.settle(effects);
    }

    fn reconcile_coupon(&mut self, submitted_coupon: String, effects: &mut Vec<Effect>) {
        if self.response_cart.is_coupon_applied {
            self.coupon_status = CouponStatus::Applied;
            self.should_show_coupon_notification = true;
            effects.push(Effect::EmitEvent(CartEvent::CartCouponApplied {
                coupon: self.response_cart.coupon.clone(),
            }));
            effects.push(Effect::ShowCouponSuccess(self.response_cart.clone()));
        } else {
            self.coupon_status = CouponStatus::Rejected;
            effects.push(Effect::EmitEvent(CartEvent::CartCouponRejected {
                coupon: submitted_coupon,
                message: self.response_cart.first_error().map(|m| m.message.clone()),
            }));
        }
    }

    /// Replay queued mutations onto the freshly received cart.
    fn settle(&mut self, effects: &mut Vec<Effect>) {
        let queued = std::mem::take(&mut self.queued);
        let mut changed = false;
        for q in &queued {
            changed |= self.apply(q);
        }

        if changed {
            self.cache_status = CacheStatus::Invalid;
            effects.push(Effect::ScheduleRevalidation);
        } else {
            self.cache_status = CacheStatus::Valid;
        }
    }

    fn fail(&mut self, kind: CartErrorKind, message: String, effects: &mut Vec<Effect>) {
        if self.coupon_status == CouponStatus::Pending {
            self.coupon_status = CouponStatus::Error;
        }
        if self.variant_request_status == VariantRequestStatus::Pending {
            self.variant_request_status = VariantRequestStatus::Error;
        }
        self.last_error = Some(CartError {
            kind,
            message: message.clone(),
        });
        effects.push(Effect::EmitEvent(CartEvent::CartError { kind, message }));

        // Without a loaded cart there is nothing safe to send. Queued
        // intents wait for the next load.
        if !self.initialized {
            self.cache_status = CacheStatus::Error;
            return;
        }

        // Optimistic mutations stay applied. Intents that arrived during a
        // failed revalidation were never sent, so give them one attempt.
        let queued = std::mem::take(&mut self.queued);
        if !queued.is_empty() {
            self.cache_status = CacheStatus::Invalid;
            effects.push(Effect::ScheduleRevalidation);
        } else {
            self.cache_status = CacheStatus::Error;
        }
    }
}
