//! Error types for cart-sync.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from encoding or decoding cart payloads.
#[derive(Debug, Error)]
pub enum CartTypesError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}

/// Which server call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartErrorKind {
    /// Fetching the cart during initialization failed.
    #[serde(rename = "GET_SERVER_CART_ERROR")]
    GetServerCart,
    /// Sending the cart (initialization or revalidation) failed.
    #[serde(rename = "SET_SERVER_CART_ERROR")]
    SetServerCart,
}

impl fmt::Display for CartErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetServerCart => f.write_str("GET_SERVER_CART_ERROR"),
            Self::SetServerCart => f.write_str("SET_SERVER_CART_ERROR"),
        }
    }
}

/// The most recent server failure, kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartError {
    /// Which call failed.
    pub kind: CartErrorKind,
    /// Error message.
    pub message: String,
}

impl fmt::Display for CartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
