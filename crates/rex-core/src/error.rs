//! Error types for rex-core.

use thiserror::Error;

/// Result type alias for core primitive operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur when constructing or combining primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid account name.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Invalid token symbol.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Invalid asset quantity (format, overflow, or out of range).
    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    /// Arithmetic on assets with different symbols.
    #[error("symbol mismatch: {left} vs {right}")]
    SymbolMismatch {
        /// Symbol of the left operand.
        left: String,
        /// Symbol of the right operand.
        right: String,
    },

    /// Invalid time value.
    #[error("invalid time: {0}")]
    InvalidTime(String),
}
