//! # cart-core
//!
//! Pure logic for cart-sync (no I/O, instant tests).
//!
//! This crate implements the cart cache-status state machine, the local
//! cart mutations it applies optimistically, and the debounce timer that
//! coalesces bursts of mutations, all without network access or clocks.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (cart store calls, timers, listeners) is performed by
//! `cart-client`, which interprets the effects produced by these state
//! machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod debounce;
pub mod mutation;
pub mod state;

pub use debounce::{coalesce, DebounceToken, Debouncer, DEFAULT_DEBOUNCE};
pub use mutation::CartMutation;
pub use state::{CartAction, CartState, Effect, RequestId};
