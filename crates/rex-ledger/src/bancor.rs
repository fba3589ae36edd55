//! Bonding-curve conversions and the RAM market.
//!
//! Both the RAM market and rent pricing use the constant-product relation
//! between two reserves: trading `x` into reserve `a` yields
//! `x * b / (a + x)` out of reserve `b`. All arithmetic is integer with
//! `u128` intermediates and floor rounding, so the product of the reserves
//! never decreases across a conversion.

use rex_core::{Asset, Symbol, RAMCORE_SYMBOL, RAM_SYMBOL};
use serde::{Deserialize, Serialize};

use crate::error::{RexError, Result};

/// Total supply of the synthetic connector token.
pub const RAMCORE_SUPPLY: i64 = 100_000_000_000_000;

/// Computes `a * b / c` with a `u128` intermediate, rounding down.
///
/// # Errors
///
/// Returns error for negative operands, a non-positive divisor, or a result
/// that does not fit in `i64`.
pub fn mul_div(a: i64, b: i64, c: i64) -> Result<i64> {
    if a < 0 || b < 0 {
        return Err(RexError::invariant(format!("mul_div of negative operand {a} * {b}")));
    }
    if c <= 0 {
        return Err(RexError::invariant(format!("mul_div by non-positive divisor {c}")));
    }
    let out = u128::from(a.unsigned_abs()) * u128::from(b.unsigned_abs())
        / u128::from(c.unsigned_abs());
    i64::try_from(out).map_err(|_| RexError::invariant("mul_div result overflows i64"))
}

/// Output of trading `input` into `in_reserve`, paid from `out_reserve`.
///
/// Returns zero when there is nothing to convert or either reserve is empty.
#[must_use]
pub fn bancor_output(in_reserve: i64, out_reserve: i64, input: i64) -> i64 {
    if input <= 0 || in_reserve < 0 || out_reserve <= 0 {
        return 0;
    }
    let denominator = i128::from(in_reserve) + i128::from(input);
    let out = i128::from(input) * i128::from(out_reserve) / denominator;
    i64::try_from(out).unwrap_or(0)
}

/// Input needed to withdraw `output` from `out_reserve` against `in_reserve`.
///
/// Returns zero when the request is empty or would drain the reserve.
#[must_use]
pub fn bancor_input(out_reserve: i64, in_reserve: i64, output: i64) -> i64 {
    if output <= 0 || output >= out_reserve || in_reserve <= 0 {
        return 0;
    }
    let remaining = i128::from(out_reserve) - i128::from(output);
    let out = i128::from(in_reserve) * i128::from(output) / remaining;
    i64::try_from(out).unwrap_or(0)
}

/// Fee on `amount` at `bps` basis points, rounded up.
#[must_use]
pub fn fee_bps(amount: i64, bps: u32) -> i64 {
    if amount <= 0 || bps == 0 {
        return 0;
    }
    let fee = (i128::from(amount) * i128::from(bps) + 9_999) / 10_000;
    i64::try_from(fee).unwrap_or(i64::MAX)
}

/// One side of the RAM market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    /// Reserve balance.
    pub balance: Asset,
    /// Connector weight, fixed at one half for both sides.
    pub weight: f64,
}

/// The RAM market: bytes on the base side, core tokens on the quote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamMarket {
    /// Fixed supply of the connector token.
    pub supply: Asset,
    /// RAM-byte reserve.
    pub base: Connector,
    /// Core-token reserve.
    pub quote: Connector,
}

impl RamMarket {
    /// Opens a market with the given reserves.
    ///
    /// # Errors
    ///
    /// Returns error unless both reserves are positive.
    pub fn new(ram_bytes: i64, quote: Asset) -> Result<Self> {
        if ram_bytes <= 0 || quote.amount <= 0 {
            return Err(RexError::invalid_quantity(
                "ram market reserves must be positive",
            ));
        }
        Ok(Self {
            supply: Asset::new(RAMCORE_SUPPLY, RAMCORE_SYMBOL),
            base: Connector {
                balance: Asset::new(ram_bytes, RAM_SYMBOL),
                weight: 0.5,
            },
            quote: Connector {
                balance: quote,
                weight: 0.5,
            },
        })
    }

    /// Symbol of the core token traded against RAM.
    #[must_use]
    pub const fn core_symbol(&self) -> Symbol {
        self.quote.balance.symbol
    }

    /// Converts `from` into `to`, moving both reserves.
    ///
    /// # Errors
    ///
    /// Returns error for non-positive input, an unsupported symbol pair, or a
    /// conversion that would empty the output reserve.
    pub fn convert(&mut self, from: Asset, to: Symbol) -> Result<Asset> {
        if from.amount <= 0 {
            return Err(RexError::invalid_quantity("conversion amount must be positive"));
        }
        if from.symbol == to {
            return Err(RexError::rejected("cannot convert to the same symbol"));
        }
        let base_sym = self.base.balance.symbol;
        let quote_sym = self.quote.balance.symbol;

        let (input, output) = if from.symbol == base_sym && to == quote_sym {
            (&mut self.base.balance, &mut self.quote.balance)
        } else if from.symbol == quote_sym && to == base_sym {
            (&mut self.quote.balance, &mut self.base.balance)
        } else {
            return Err(RexError::rejected("invalid conversion"));
        };

        let out = bancor_output(input.amount, output.amount, from.amount);
        if out >= output.amount {
            return Err(RexError::rejected("conversion would drain the reserve"));
        }
        input.amount = input
            .amount
            .checked_add(from.amount)
            .ok_or_else(|| RexError::invalid_quantity("reserve overflow"))?;
        output.amount -= out;
        Ok(Asset::new(out, to))
    }

    /// Core tokens needed to buy `bytes`, before fees.
    #[must_use]
    pub fn cost_of_bytes(&self, bytes: i64) -> i64 {
        bancor_input(self.base.balance.amount, self.quote.balance.amount, bytes)
    }

    /// Grows the RAM reserve.
    pub fn add_ram(&mut self, bytes: i64) {
        self.base.balance.amount = self.base.balance.amount.saturating_add(bytes);
    }
}
