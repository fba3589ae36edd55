//! # rex-core
//!
//! Primitives shared by the resource exchange ledger and its tooling.
//!
//! This crate provides:
//!
//! - [`Name`] — Packed 64-bit account name (`a-z`, `1-5`, `.`)
//! - [`Symbol`] — Token symbol with decimal precision (`4,EOS`)
//! - [`Asset`] — Signed token quantity tagged with its symbol
//! - [`TimePointSec`] — Second-resolution timestamps with day arithmetic

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod asset;
pub mod error;
pub mod name;
pub mod time;

pub use asset::{Asset, Symbol, MAX_ASSET_AMOUNT};
pub use error::{CoreError, Result};
pub use name::Name;
pub use time::{TimePointSec, SECONDS_PER_DAY, SECONDS_PER_HOUR};

/// Symbol of REX shares.
pub const REX_SYMBOL: Symbol = Symbol::new_unchecked(4, "REX");

/// Symbol of the RAM-market connector supply token.
pub const RAMCORE_SYMBOL: Symbol = Symbol::new_unchecked(4, "RAMCORE");

/// Symbol of RAM bytes in the RAM market.
pub const RAM_SYMBOL: Symbol = Symbol::new_unchecked(0, "RAM");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(REX_SYMBOL.to_string(), "4,REX");
        assert_eq!(RAMCORE_SYMBOL.precision(), 4);
        assert_eq!(RAM_SYMBOL.code(), "RAM");
    }
}
