//! Persisted ledger state.
//!
//! Every table lives in one [`RexState`] value. The engine clones it at the
//! start of an action and commits the clone only if the action succeeds.

use std::collections::BTreeMap;

use rex_core::{Asset, Name};
use serde::{Deserialize, Serialize};

use crate::balance::{RexBalance, RexFund};
use crate::bancor::RamMarket;
use crate::config::RexConfig;
use crate::error::{RexError, Result};
use crate::loans::{LoanTable, Resource};
use crate::orders::OrderQueue;
use crate::pool::{RexPool, REX_POOL_VERSION};
use crate::return_pool::{ReturnBuckets, ReturnPool};

/// Global RAM accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamGlobals {
    /// Total RAM in bytes.
    pub max_ram_size: u64,
    /// Bytes sold to accounts.
    pub total_ram_bytes_reserved: u64,
    /// Core tokens paid in for reserved RAM.
    pub total_ram_stake: i64,
}

impl RamGlobals {
    /// RAM not yet sold.
    #[must_use]
    pub const fn free_ram(&self) -> u64 {
        self.max_ram_size.saturating_sub(self.total_ram_bytes_reserved)
    }
}

/// Runtime maturity settings changed by `setrexmature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RexMaturity {
    /// Record version.
    pub version: u8,
    /// Days until purchased REX matures.
    pub num_of_maturity_buckets: u32,
    /// Place purchased REX directly into savings.
    pub buy_rex_to_savings: bool,
}

impl RexMaturity {
    /// Settings implied by `config` before any `setrexmature`.
    #[must_use]
    pub const fn from_config(config: &RexConfig) -> Self {
        Self {
            version: 0,
            num_of_maturity_buckets: config.default_maturity_buckets,
            buy_rex_to_savings: false,
        }
    }
}

/// All tables owned by the system contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RexStateRecord")]
pub struct RexState {
    /// RAM market, once initialized.
    pub ram_market: Option<RamMarket>,
    /// RAM totals.
    pub ram: RamGlobals,
    /// Lending pool, created by the first purchase.
    pub pool: Option<RexPool>,
    /// Release schedule, created with the pool.
    pub return_pool: Option<ReturnPool>,
    /// Live return buckets.
    pub return_buckets: ReturnBuckets,
    /// REX funds by owner.
    pub funds: BTreeMap<Name, RexFund>,
    /// Share balances by owner.
    pub balances: BTreeMap<Name, RexBalance>,
    /// CPU rentals.
    pub cpu_loans: LoanTable,
    /// NET rentals.
    pub net_loans: LoanTable,
    /// Sell orders.
    pub orders: OrderQueue,
    /// Maturity settings, absent until first set.
    pub maturity: Option<RexMaturity>,
}

impl RexState {
    /// Fresh state sized by `config`.
    #[must_use]
    pub fn new(config: &RexConfig) -> Self {
        Self {
            ram_market: None,
            ram: RamGlobals {
                max_ram_size: config.max_ram_size,
                ..RamGlobals::default()
            },
            pool: None,
            return_pool: None,
            return_buckets: ReturnBuckets::default(),
            funds: BTreeMap::new(),
            balances: BTreeMap::new(),
            cpu_loans: LoanTable::new(),
            net_loans: LoanTable::new(),
            orders: OrderQueue::new(),
            maturity: None,
        }
    }

    /// Loan table for `resource`.
    #[must_use]
    pub const fn loans(&self, resource: Resource) -> &LoanTable {
        match resource {
            Resource::Cpu => &self.cpu_loans,
            Resource::Net => &self.net_loans,
        }
    }

    /// Mutable loan table for `resource`.
    pub fn loans_mut(&mut self, resource: Resource) -> &mut LoanTable {
        match resource {
            Resource::Cpu => &mut self.cpu_loans,
            Resource::Net => &mut self.net_loans,
        }
    }

    /// Fund balance of `owner`, if a fund row exists.
    #[must_use]
    pub fn fund_balance(&self, owner: Name) -> Option<Asset> {
        self.funds.get(&owner).map(|f| f.balance)
    }

    /// Current maturity settings.
    #[must_use]
    pub fn maturity_settings(&self, config: &RexConfig) -> RexMaturity {
        self.maturity
            .unwrap_or_else(|| RexMaturity::from_config(config))
    }

    /// Checks cross-table invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::Invariant`] describing the first violation.
    pub fn check_invariants(&self) -> Result<()> {
        for balance in self.balances.values() {
            balance.check()?;
        }
        for fund in self.funds.values() {
            if fund.balance.amount < 0 {
                return Err(RexError::invariant(format!(
                    "negative fund balance for {}",
                    fund.owner
                )));
            }
        }
        let shares: i64 = self.balances.values().map(|b| b.rex_balance.amount).sum();
        let Some(pool) = &self.pool else {
            if shares != 0 {
                return Err(RexError::invariant("shares exist without a pool"));
            }
            return Ok(());
        };
        pool.check()?;
        if shares != pool.total_rex.amount {
            return Err(RexError::invariant(format!(
                "sum of balances {shares} != total_rex {}",
                pool.total_rex.amount
            )));
        }
        let staked: i64 = self
            .cpu_loans
            .iter()
            .chain(self.net_loans.iter())
            .map(|l| l.total_staked.amount)
            .sum();
        if staked != pool.total_lent.amount {
            return Err(RexError::invariant(format!(
                "sum of loan stakes {staked} != total_lent {}",
                pool.total_lent.amount
            )));
        }
        if let Some(rp) = &self.return_pool {
            rp.check(&self.return_buckets)?;
        }
        Ok(())
    }
}

impl Default for RexState {
    fn default() -> Self {
        Self::new(&RexConfig::default())
    }
}

/// Pool row as stored by any version. Version 0 rows lack `loan_num`.
#[derive(Deserialize)]
struct RexPoolRecord {
    version: u8,
    total_lent: Asset,
    total_unlent: Asset,
    total_rent: Asset,
    total_lendable: Asset,
    total_rex: Asset,
    namebid_proceeds: Asset,
    #[serde(default)]
    loan_num: Option<u64>,
}

#[derive(Deserialize)]
struct RexStateRecord {
    ram_market: Option<RamMarket>,
    #[serde(default)]
    ram: RamGlobals,
    pool: Option<RexPoolRecord>,
    return_pool: Option<ReturnPool>,
    #[serde(default)]
    return_buckets: ReturnBuckets,
    #[serde(default)]
    funds: BTreeMap<Name, RexFund>,
    #[serde(default)]
    balances: BTreeMap<Name, RexBalance>,
    #[serde(default)]
    cpu_loans: LoanTable,
    #[serde(default)]
    net_loans: LoanTable,
    #[serde(default)]
    orders: OrderQueue,
    #[serde(default)]
    maturity: Option<RexMaturity>,
}

impl TryFrom<RexStateRecord> for RexState {
    type Error = RexError;

    fn try_from(record: RexStateRecord) -> Result<Self> {
        let pool = record.pool.map(|p| {
            // Older pools did not count loans; resume after the highest one.
            let loan_num = p.loan_num.unwrap_or_else(|| {
                record
                    .cpu_loans
                    .max_loan_num()
                    .max(record.net_loans.max_loan_num())
                    .unwrap_or(0)
            });
            RexPool {
                version: p.version.max(REX_POOL_VERSION),
                total_lent: p.total_lent,
                total_unlent: p.total_unlent,
                total_rent: p.total_rent,
                total_lendable: p.total_lendable,
                total_rex: p.total_rex,
                namebid_proceeds: p.namebid_proceeds,
                loan_num,
            }
        });
        for (owner, balance) in &record.balances {
            if *owner != balance.owner {
                return Err(RexError::Snapshot(format!(
                    "balance row keyed {owner} belongs to {}",
                    balance.owner
                )));
            }
        }
        Ok(Self {
            ram_market: record.ram_market,
            ram: record.ram,
            pool,
            return_pool: record.return_pool,
            return_buckets: record.return_buckets,
            funds: record.funds,
            balances: record.balances,
            cpu_loans: record.cpu_loans,
            net_loans: record.net_loans,
            orders: record.orders,
            maturity: record.maturity,
        })
    }
}
