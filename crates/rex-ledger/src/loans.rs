//! Rental tables.
//!
//! Rows are keyed by loan number, with ordered indices by expiration and by
//! creator kept in step on every insert, update and removal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rex_core::{Asset, Name, TimePointSec};
use serde::{Deserialize, Serialize};

use crate::error::{RexError, Result};

/// Current record version of [`RexLoan`].
pub const REX_LOAN_VERSION: u8 = 0;

/// Rentable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// CPU time.
    Cpu,
    /// Network bandwidth.
    Net,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Net => write!(f, "net"),
        }
    }
}

/// An active rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RexLoan {
    /// Record version.
    pub version: u8,
    /// Account paying for the rental.
    pub from: Name,
    /// Account receiving the resource.
    pub receiver: Name,
    /// Rent per period.
    pub payment: Asset,
    /// Reserve used for renewals.
    pub balance: Asset,
    /// Tokens delegated to the receiver this period.
    pub total_staked: Asset,
    /// Primary key.
    pub loan_num: u64,
    /// End of the current period.
    pub expiration: TimePointSec,
}

/// One loan table with its secondary indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RexLoan>", into = "Vec<RexLoan>")]
pub struct LoanTable {
    rows: BTreeMap<u64, RexLoan>,
    by_expiration: BTreeSet<(TimePointSec, u64)>,
    by_owner: BTreeSet<(Name, u64)>,
}

impl LoanTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new row.
    ///
    /// # Errors
    ///
    /// Returns error if the loan number is already taken.
    pub fn insert(&mut self, loan: RexLoan) -> Result<()> {
        if self.rows.contains_key(&loan.loan_num) {
            return Err(RexError::invariant(format!(
                "duplicate loan number {}",
                loan.loan_num
            )));
        }
        self.by_expiration.insert((loan.expiration, loan.loan_num));
        self.by_owner.insert((loan.from, loan.loan_num));
        self.rows.insert(loan.loan_num, loan);
        Ok(())
    }

    /// Row by loan number.
    #[must_use]
    pub fn get(&self, loan_num: u64) -> Option<&RexLoan> {
        self.rows.get(&loan_num)
    }

    /// Updates a row in place, reindexing afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::NotFound`] for an unknown loan, or the closure's
    /// error. The closure must not change `loan_num`.
    pub fn modify<F>(&mut self, loan_num: u64, f: F) -> Result<()>
    where
        F: FnOnce(&mut RexLoan) -> Result<()>,
    {
        let loan = self
            .rows
            .get_mut(&loan_num)
            .ok_or_else(|| RexError::not_found("loan not found"))?;
        let old_key = (loan.expiration, loan.from);
        f(loan)?;
        if loan.loan_num != loan_num {
            return Err(RexError::invariant("loan number changed during update"));
        }
        let new_key = (loan.expiration, loan.from);
        if old_key != new_key {
            self.by_expiration.remove(&(old_key.0, loan_num));
            self.by_owner.remove(&(old_key.1, loan_num));
            self.by_expiration.insert((new_key.0, loan_num));
            self.by_owner.insert((new_key.1, loan_num));
        }
        Ok(())
    }

    /// Removes and returns a row.
    pub fn remove(&mut self, loan_num: u64) -> Option<RexLoan> {
        let loan = self.rows.remove(&loan_num)?;
        self.by_expiration.remove(&(loan.expiration, loan_num));
        self.by_owner.remove(&(loan.from, loan_num));
        Some(loan)
    }

    /// Earliest-expiring loan if it has expired by `now`.
    #[must_use]
    pub fn next_expired(&self, now: TimePointSec) -> Option<u64> {
        self.by_expiration
            .first()
            .filter(|(expiration, _)| *expiration <= now)
            .map(|(_, loan_num)| *loan_num)
    }

    /// True if `owner` created any loan in this table.
    #[must_use]
    pub fn has_loans_from(&self, owner: Name) -> bool {
        self.by_owner
            .range((owner, 0)..=(owner, u64::MAX))
            .next()
            .is_some()
    }

    /// Loans created by `owner`.
    pub fn loans_from(&self, owner: Name) -> impl Iterator<Item = &RexLoan> {
        self.by_owner
            .range((owner, 0)..=(owner, u64::MAX))
            .filter_map(|(_, n)| self.rows.get(n))
    }

    /// Rows in loan-number order.
    pub fn iter(&self) -> impl Iterator<Item = &RexLoan> {
        self.rows.values()
    }

    /// Highest loan number present.
    #[must_use]
    pub fn max_loan_num(&self) -> Option<u64> {
        self.rows.keys().next_back().copied()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TryFrom<Vec<RexLoan>> for LoanTable {
    type Error = RexError;

    fn try_from(rows: Vec<RexLoan>) -> Result<Self> {
        let mut table = Self::new();
        for loan in rows {
            table.insert(loan)?;
        }
        Ok(table)
    }
}

impl From<LoanTable> for Vec<RexLoan> {
    fn from(table: LoanTable) -> Self {
        table.rows.into_values().collect()
    }
}
