//! Per-owner fund and share rows.

use rex_core::{Asset, Name, Symbol, TimePointSec, REX_SYMBOL};
use serde::{Deserialize, Serialize};

use crate::error::{RexError, Result};

/// Current record version of [`RexBalance`].
pub const REX_BALANCE_VERSION: u8 = 1;

/// Tokens an owner has set aside for REX operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RexFund {
    /// Record version.
    pub version: u8,
    /// Owning account.
    pub owner: Name,
    /// Available balance.
    pub balance: Asset,
}

impl RexFund {
    /// Empty fund.
    #[must_use]
    pub const fn new(owner: Name, core: Symbol) -> Self {
        Self {
            version: 0,
            owner,
            balance: Asset::zero(core),
        }
    }
}

/// Shares maturing at `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturityBucket {
    /// When the shares become sellable. [`TimePointSec::MAX`] marks savings.
    pub date: TimePointSec,
    /// Shares in the bucket.
    pub amount: i64,
}

/// An owner's share holdings and vote weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RexBalance {
    /// Record version. Version 0 rows predate `matured_rex`.
    pub version: u8,
    /// Owning account.
    pub owner: Name,
    /// Core value counted toward voting power.
    pub vote_stake: Asset,
    /// All shares owned.
    pub rex_balance: Asset,
    /// Shares that may be sold now.
    #[serde(default)]
    pub matured_rex: i64,
    /// Maturing shares, ascending by date, savings last.
    pub rex_maturities: Vec<MaturityBucket>,
}

impl RexBalance {
    /// Empty row.
    #[must_use]
    pub const fn new(owner: Name, core: Symbol) -> Self {
        Self {
            version: REX_BALANCE_VERSION,
            owner,
            vote_stake: Asset::zero(core),
            rex_balance: Asset::zero(REX_SYMBOL),
            matured_rex: 0,
            rex_maturities: Vec::new(),
        }
    }

    /// Moves every bucket dated at or before `now` into `matured_rex`.
    pub fn process_maturities(&mut self, now: TimePointSec) {
        let due = self.rex_maturities.partition_point(|b| b.date <= now);
        self.matured_rex += self.rex_maturities.drain(..due).map(|b| b.amount).sum::<i64>();
    }

    /// Adds shares maturing at `date`, merging with an existing bucket.
    pub fn add_maturing(&mut self, date: TimePointSec, amount: i64) {
        if amount <= 0 {
            return;
        }
        match self.rex_maturities.binary_search_by_key(&date, |b| b.date) {
            Ok(i) => self.rex_maturities[i].amount += amount,
            Err(i) => self
                .rex_maturities
                .insert(i, MaturityBucket { date, amount }),
        }
    }

    /// Shares held in savings.
    #[must_use]
    pub fn savings(&self) -> i64 {
        self.rex_maturities
            .last()
            .filter(|b| b.date == TimePointSec::MAX)
            .map_or(0, |b| b.amount)
    }

    /// Removes and returns the savings bucket amount.
    pub fn take_savings(&mut self) -> i64 {
        if self.rex_maturities.last().is_some_and(|b| b.date == TimePointSec::MAX) {
            self.rex_maturities.pop().map_or(0, |b| b.amount)
        } else {
            0
        }
    }

    /// Replaces savings with `amount`.
    pub fn put_savings(&mut self, amount: i64) {
        self.take_savings();
        self.add_maturing(TimePointSec::MAX, amount);
    }

    /// Shares still maturing, savings excluded.
    #[must_use]
    pub fn maturing(&self) -> i64 {
        self.rex_maturities
            .iter()
            .filter(|b| b.date != TimePointSec::MAX)
            .map(|b| b.amount)
            .sum()
    }

    /// Moves `rex` shares into savings, latest-maturing first, then from
    /// matured shares. `reserved` matured shares back an open sell order.
    ///
    /// Call [`RexBalance::process_maturities`] first.
    ///
    /// # Errors
    ///
    /// Returns error if the unreserved balance cannot cover `rex`.
    pub fn move_to_savings(&mut self, rex: i64, reserved: i64) -> Result<()> {
        let savings = self.take_savings();
        if rex + reserved + savings > self.rex_balance.amount {
            self.put_savings(savings);
            return Err(RexError::insufficient("insufficient REX balance"));
        }
        let mut moved = 0;
        while moved < rex {
            let Some(last) = self.rex_maturities.last_mut() else {
                break;
            };
            let take = last.amount.min(rex - moved);
            last.amount -= take;
            moved += take;
            if last.amount == 0 {
                self.rex_maturities.pop();
            }
        }
        if moved < rex {
            let rest = rex - moved;
            if self.matured_rex - rest < reserved {
                return Err(RexError::insufficient("insufficient REX balance"));
            }
            self.matured_rex -= rest;
        }
        self.put_savings(savings + rex);
        Ok(())
    }

    /// Moves `rex` shares out of savings into a bucket maturing at `maturity`.
    ///
    /// # Errors
    ///
    /// Returns error if savings hold fewer than `rex` shares.
    pub fn move_from_savings(&mut self, rex: i64, maturity: TimePointSec) -> Result<()> {
        let savings = self.savings();
        if rex > savings {
            return Err(RexError::insufficient("insufficient REX in savings"));
        }
        self.put_savings(savings - rex);
        self.add_maturing(maturity, rex);
        Ok(())
    }

    /// Merges every maturing bucket and the unreserved matured shares into a
    /// single bucket at `maturity`. Savings are untouched.
    pub fn consolidate(&mut self, reserved: i64, maturity: TimePointSec) {
        let savings = self.take_savings();
        let total = self.matured_rex - reserved + self.maturing();
        self.matured_rex = reserved;
        self.rex_maturities.clear();
        self.add_maturing(maturity, total);
        self.put_savings(savings);
    }

    /// Checks that buckets and matured shares fit within the balance.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::Invariant`] on violation.
    pub fn check(&self) -> Result<()> {
        let bucketed: i64 = self.rex_maturities.iter().map(|b| b.amount).sum();
        let sorted = self.rex_maturities.windows(2).all(|w| w[0].date < w[1].date);
        if self.matured_rex < 0
            || !sorted
            || self.rex_maturities.iter().any(|b| b.amount <= 0)
            || self.rex_balance.amount < self.matured_rex + bucketed
        {
            return Err(RexError::invariant(format!(
                "balance row of {} is inconsistent",
                self.owner
            )));
        }
        Ok(())
    }
}
