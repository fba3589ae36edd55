//! The lending pool singleton.
//!
//! Share price is `total_lendable / total_rex`. Rented tokens stay in the
//! pool as `total_lent`; `total_rent` is the virtual reserve the rent curve
//! prices against.

use rex_core::{Asset, Symbol, REX_SYMBOL};
use serde::{Deserialize, Serialize};

use crate::bancor::{bancor_output, mul_div};
use crate::config::RexConfig;
use crate::error::{RexError, Result};

/// Current record version of [`RexPool`].
pub const REX_POOL_VERSION: u8 = 1;

/// Central ledger of lendable tokens and outstanding shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RexPool {
    /// Record version.
    pub version: u8,
    /// Tokens currently rented out.
    pub total_lent: Asset,
    /// Tokens available for rent or redemption.
    pub total_unlent: Asset,
    /// Virtual rent reserve of the pricing curve.
    pub total_rent: Asset,
    /// `total_lent + total_unlent`.
    pub total_lendable: Asset,
    /// Outstanding shares.
    pub total_rex: Asset,
    /// Name-auction proceeds waiting to be channelled in.
    pub namebid_proceeds: Asset,
    /// Last loan number issued.
    pub loan_num: u64,
}

/// Outcome of redeeming shares against the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
    /// Whether unlent liquidity covered the proceeds.
    pub filled: bool,
    /// Core tokens owed for the shares.
    pub proceeds: i64,
    /// Share value of the full balance before the redemption.
    pub stake_value: i64,
}

impl RexPool {
    /// Empty pool priced with the configured initial rent reserve.
    #[must_use]
    pub const fn new(core: Symbol, config: &RexConfig) -> Self {
        Self {
            version: REX_POOL_VERSION,
            total_lent: Asset::zero(core),
            total_unlent: Asset::zero(core),
            total_rent: Asset::new(config.init_total_rent, core),
            total_lendable: Asset::zero(core),
            total_rex: Asset::zero(REX_SYMBOL),
            namebid_proceeds: Asset::zero(core),
            loan_num: 0,
        }
    }

    /// True while shares are outstanding.
    #[must_use]
    pub const fn has_shares(&self) -> bool {
        self.total_rex.amount > 0
    }

    /// True when the pool can price a new rental.
    #[must_use]
    pub const fn can_lend(&self) -> bool {
        self.has_shares() && self.total_unlent.amount > 0 && self.total_rent.amount > 0
    }

    /// Core value of `rex` shares at the current price.
    ///
    /// # Errors
    ///
    /// Returns error if no shares are outstanding.
    pub fn value_of(&self, rex: i64) -> Result<i64> {
        mul_div(rex, self.total_lendable.amount, self.total_rex.amount)
    }

    /// Adds `payment` to the pool and mints shares for it.
    ///
    /// An empty pool mints `payment * rex_ratio`; a pool left with no shares
    /// keeps any residual lendable tokens and resets its rent reserve.
    ///
    /// # Errors
    ///
    /// Returns error on a non-positive payment or overflow.
    pub fn add_lendable(&mut self, payment: i64, config: &RexConfig) -> Result<i64> {
        if payment <= 0 {
            return Err(RexError::invalid_quantity("must use positive amount"));
        }
        let s0 = self.total_lendable.amount;
        let s1 = s0
            .checked_add(payment)
            .ok_or_else(|| RexError::invariant("total_lendable overflow"))?;

        let minted = if self.has_shares() {
            let r0 = self.total_rex.amount;
            mul_div(s1, r0, s0)? - r0
        } else {
            self.total_rent.amount = config.init_total_rent;
            payment
                .checked_mul(config.rex_ratio)
                .ok_or_else(|| RexError::invalid_quantity("REX purchase too large"))?
        };

        self.total_lendable.amount = s1;
        self.total_unlent.amount = s1 - self.total_lent.amount;
        self.total_rex.amount = self
            .total_rex
            .amount
            .checked_add(minted)
            .ok_or_else(|| RexError::invariant("total_rex overflow"))?;
        Ok(minted)
    }

    /// Prices `rex` shares against unlent liquidity and, when covered,
    /// burns them.
    ///
    /// A sale fills when `proceeds <= total_unlent`, less an optional reserve
    /// of `total_lent * unlent_lower_bound_pct / 100`. `owned` is the
    /// redeemer's whole share balance.
    ///
    /// # Errors
    ///
    /// Returns error if the proceeds round to zero.
    pub fn redeem(&mut self, rex: i64, owned: i64, config: &RexConfig) -> Result<Redemption> {
        let s0 = self.total_lendable.amount;
        let r0 = self.total_rex.amount;
        let proceeds = mul_div(rex, s0, r0)?;
        if proceeds <= 0 {
            return Err(RexError::rejected("proceeds are negligible"));
        }
        let reserve = mul_div(
            self.total_lent.amount,
            i64::from(config.unlent_lower_bound_pct),
            100,
        )?;
        let available = self.total_unlent.amount - reserve;
        let stake_value = mul_div(owned, s0, r0)?;

        let filled = proceeds <= available;
        if filled {
            self.total_rex.amount = checked_sub(r0, rex, "total_rex")?;
            self.total_lendable.amount = checked_sub(s0, proceeds, "total_lendable")?;
            self.total_unlent.amount = self.total_lendable.amount - self.total_lent.amount;
        }
        Ok(Redemption {
            filled,
            proceeds,
            stake_value,
        })
    }

    /// Tokens a rental paying `payment` receives at the current price.
    #[must_use]
    pub fn rent_quote(&self, payment: i64) -> i64 {
        bancor_output(self.total_rent.amount, self.total_unlent.amount, payment)
    }

    /// Books a rental: `payment` enters the rent reserve and `rented` moves
    /// from unlent to lent. A new loan takes the next loan number.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::Invariant`] on overflow or if `rented` exceeds
    /// unlent liquidity.
    pub fn add_loan(&mut self, payment: i64, rented: i64, new_loan: bool) -> Result<()> {
        self.total_rent.amount = checked_add(self.total_rent.amount, payment, "total_rent")?;
        self.total_unlent.amount = checked_sub(self.total_unlent.amount, rented, "total_unlent")?;
        self.total_lent.amount = checked_add(self.total_lent.amount, rented, "total_lent")?;
        self.total_lendable.amount =
            checked_add(self.total_unlent.amount, self.total_lent.amount, "total_lendable")?;
        if new_loan {
            self.loan_num = self
                .loan_num
                .checked_add(1)
                .ok_or_else(|| RexError::invariant("loan_num overflow"))?;
        }
        Ok(())
    }

    /// Releases a rental's `staked` tokens back to unlent and lowers the rent
    /// reserve along the curve.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::Invariant`] if `staked` exceeds `total_lent`.
    pub fn remove_loan(&mut self, staked: i64) -> Result<()> {
        let delta_rent = bancor_output(self.total_unlent.amount, self.total_rent.amount, staked);
        self.total_rent.amount = checked_sub(self.total_rent.amount, delta_rent, "total_rent")?;
        self.total_unlent.amount = checked_add(self.total_unlent.amount, staked, "total_unlent")?;
        self.total_lent.amount = checked_sub(self.total_lent.amount, staked, "total_lent")?;
        self.total_lendable.amount =
            checked_add(self.total_unlent.amount, self.total_lent.amount, "total_lendable")?;
        Ok(())
    }

    /// Adds released return-pool proceeds to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::Invariant`] on overflow.
    pub fn add_returns(&mut self, amount: i64) -> Result<()> {
        self.total_unlent.amount = checked_add(self.total_unlent.amount, amount, "total_unlent")?;
        self.total_lendable.amount =
            checked_add(self.total_lendable.amount, amount, "total_lendable")?;
        Ok(())
    }

    /// Checks the pool identity and sign constraints.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::Invariant`] describing the first violation.
    pub fn check(&self) -> Result<()> {
        if self.total_lendable.amount != self.total_lent.amount + self.total_unlent.amount {
            return Err(RexError::invariant(format!(
                "total_lendable {} != total_lent {} + total_unlent {}",
                self.total_lendable, self.total_lent, self.total_unlent
            )));
        }
        if self.total_lent.amount < 0 || self.total_unlent.amount < 0 || self.total_rex.amount < 0
        {
            return Err(RexError::invariant("negative pool balance"));
        }
        if self.total_rent.amount <= 0 {
            return Err(RexError::invariant("total_rent must stay positive"));
        }
        Ok(())
    }
}

fn checked_add(a: i64, b: i64, field: &str) -> Result<i64> {
    a.checked_add(b)
        .ok_or_else(|| RexError::invariant(format!("{field} overflow")))
}

fn checked_sub(a: i64, b: i64, field: &str) -> Result<i64> {
    a.checked_sub(b)
        .filter(|v| *v >= 0)
        .ok_or_else(|| RexError::invariant(format!("{field} would go negative")))
}
