//! Error types for rex-ledger.

use rex_core::{CoreError, Name, Symbol};
use thiserror::Error;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, RexError>;

/// How a failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Bad input or missing authority; surfaced verbatim.
    Caller,
    /// The request is well formed but the market cannot honor it.
    Infeasible,
    /// Internal consistency failure or I/O.
    Internal,
}

/// Errors that abort a ledger action.
#[derive(Debug, Error)]
pub enum RexError {
    /// Primitive construction or arithmetic failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The signer is not the account the action must be authorized by.
    #[error("missing authority of {0}")]
    MissingAuth(Name),

    /// A quantity argument is out of range.
    #[error("{0}")]
    InvalidQuantity(String),

    /// An asset uses the wrong symbol.
    #[error("{context}: expected {expected}, got {actual}")]
    SymbolMismatch {
        /// What was being checked.
        context: &'static str,
        /// Symbol the action requires.
        expected: Symbol,
        /// Symbol supplied.
        actual: Symbol,
    },

    /// The system or REX pool has not been initialized.
    #[error("{0}")]
    NotInitialized(&'static str),

    /// No lendable liquidity for rentals.
    #[error("rex loans are currently not available")]
    Unavailable,

    /// A balance is too small for the requested operation.
    #[error("{0}")]
    InsufficientFunds(String),

    /// A referenced row does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with current state.
    #[error("{0}")]
    Rejected(String),

    /// A token transfer performed by a collaborator failed.
    #[error("token transfer failed: {0}")]
    Transfer(String),

    /// An internal invariant no longer holds.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Snapshot could not be decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RexError {
    /// Create an invalid quantity error.
    #[must_use]
    pub fn invalid_quantity(message: impl Into<String>) -> Self {
        Self::InvalidQuantity(message.into())
    }

    /// Create an insufficient funds error.
    #[must_use]
    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientFunds(message.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a rejection error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Create an invariant violation error.
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// Classifies the failure.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Core(_)
            | Self::MissingAuth(_)
            | Self::InvalidQuantity(_)
            | Self::SymbolMismatch { .. }
            | Self::NotInitialized(_)
            | Self::NotFound(_)
            | Self::Rejected(_) => FailureClass::Caller,
            Self::Unavailable | Self::InsufficientFunds(_) | Self::Transfer(_) => {
                FailureClass::Infeasible
            }
            Self::Invariant(_)
            | Self::Config(_)
            | Self::Snapshot(_)
            | Self::Io(_)
            | Self::Json(_) => FailureClass::Internal,
        }
    }
}
