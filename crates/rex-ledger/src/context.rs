//! Per-action execution context.
//!
//! A [`Context`] borrows the working copies of state and host for one action
//! and carries the helpers shared by every action: fund movements, pool and
//! balance bookkeeping, order settlement and return-pool feeding.

use std::collections::btree_map::Entry;

use rex_core::{Asset, Name, Symbol, TimePointSec};
use tracing::debug;

use crate::balance::{RexBalance, RexFund};
use crate::bancor::{mul_div, RamMarket};
use crate::config::RexConfig;
use crate::engine::{DrainReport, RexNotice};
use crate::error::{RexError, Result};
use crate::host::{Host, REX_ACCOUNT};
use crate::pool::RexPool;
use crate::return_pool::ReturnPool;
use crate::state::RexState;

/// Outcome of trying to fill a sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillResult {
    /// Whether the shares were burned.
    pub success: bool,
    /// Core tokens owed for the shares.
    pub proceeds: i64,
    /// Change to the seller's vote stake.
    pub stake_change: i64,
}

/// Working set of one action.
pub struct Context<'a, H: Host> {
    /// State being mutated.
    pub state: &'a mut RexState,
    /// Host being mutated.
    pub host: &'a mut H,
    /// Ledger parameters.
    pub config: &'a RexConfig,
    /// Block time of the action.
    pub now: TimePointSec,
    /// Result records emitted so far.
    pub notices: Vec<RexNotice>,
    /// Drain work done so far.
    pub report: DrainReport,
}

impl<'a, H: Host> Context<'a, H> {
    /// Opens a context at `now`.
    pub fn new(
        state: &'a mut RexState,
        host: &'a mut H,
        config: &'a RexConfig,
        now: TimePointSec,
    ) -> Self {
        Self {
            state,
            host,
            config,
            now,
            notices: Vec::new(),
            report: DrainReport::default(),
        }
    }

    /// Core token symbol, fixed when the RAM market was initialized.
    pub fn core_symbol(&self) -> Result<Symbol> {
        self.state
            .ram_market
            .as_ref()
            .map(RamMarket::core_symbol)
            .ok_or(RexError::NotInitialized(
                "system contract must first be initialized",
            ))
    }

    /// Fails unless `quantity` is denominated in the core token.
    pub fn require_core(&self, quantity: Asset, context: &'static str) -> Result<Symbol> {
        let core = self.core_symbol()?;
        if quantity.symbol != core {
            return Err(RexError::SymbolMismatch {
                context,
                expected: core,
                actual: quantity.symbol,
            });
        }
        Ok(core)
    }

    /// True once the pool exists.
    pub fn rex_system_initialized(&self) -> bool {
        self.state.pool.is_some()
    }

    /// True while shares are outstanding.
    pub fn rex_available(&self) -> bool {
        self.state.pool.as_ref().is_some_and(RexPool::has_shares)
    }

    /// The pool, or an error if no REX was ever bought.
    pub fn pool(&self) -> Result<&RexPool> {
        self.state
            .pool
            .as_ref()
            .ok_or(RexError::NotInitialized("rex system not initialized yet"))
    }

    /// Mutable pool.
    pub fn pool_mut(&mut self) -> Result<&mut RexPool> {
        self.state
            .pool
            .as_mut()
            .ok_or(RexError::NotInitialized("rex system not initialized yet"))
    }

    /// Records a result notice.
    pub fn emit(&mut self, notice: RexNotice) {
        self.notices.push(notice);
    }

    /// Credits the owner's REX fund, creating it on demand.
    pub fn transfer_to_fund(&mut self, owner: Name, amount: Asset) -> Result<()> {
        let fund = self
            .state
            .funds
            .entry(owner)
            .or_insert_with(|| RexFund::new(owner, amount.symbol));
        fund.balance = fund.balance.checked_add(amount)?;
        Ok(())
    }

    /// Debits the owner's REX fund.
    pub fn transfer_from_fund(&mut self, owner: Name, amount: Asset) -> Result<()> {
        let fund = self
            .state
            .funds
            .get_mut(&owner)
            .ok_or_else(|| RexError::not_found("must deposit to REX fund first"))?;
        if fund.balance.amount < amount.amount {
            return Err(RexError::insufficient("insufficient funds"));
        }
        fund.balance = fund.balance.checked_sub(amount)?;
        Ok(())
    }

    /// Settles a filled order of `owner`, credits `proceeds`, and applies
    /// `delta_stake` to voting power.
    ///
    /// Returns the shares still reserved by an open order.
    pub fn update_rex_account(
        &mut self,
        owner: Name,
        proceeds: i64,
        delta_stake: i64,
        force_vote_update: bool,
    ) -> Result<i64> {
        let mut to_fund = proceeds;
        let mut to_stake = delta_stake;
        let mut rex_in_sell_order = 0;

        let open = self
            .state
            .orders
            .get(owner)
            .map(|o| (o.is_open, o.rex_requested.amount));
        match open {
            Some((true, requested)) => rex_in_sell_order = requested,
            Some((false, _)) => {
                if let Some(order) = self.state.orders.remove(owner) {
                    to_fund += order.proceeds.amount;
                    to_stake += order.stake_change.amount;
                    debug!(owner = %owner, proceeds = %order.proceeds, "closed sell order settled");
                }
            }
            None => {}
        }

        if to_fund > 0 {
            let core = self.core_symbol()?;
            self.transfer_to_fund(owner, Asset::new(to_fund, core))?;
        }
        if force_vote_update || to_stake != 0 {
            self.host.update_voting_power(owner, to_stake)?;
        }
        Ok(rex_in_sell_order)
    }

    /// Releases return-pool proceeds due by now into the pool.
    pub fn update_rex_pool(&mut self) -> Result<()> {
        let (Some(pool), Some(rp)) = (self.state.pool.as_mut(), self.state.return_pool.as_mut())
        else {
            return Ok(());
        };
        let released = rp.distribute(self.now, &mut self.state.return_buckets, self.config)?;
        if released > 0 {
            pool.add_returns(released)?;
            debug!(released, "return pool distributed");
        }
        Ok(())
    }

    /// Queues `amount` for gradual release into the pool.
    pub fn add_to_return_pool(&mut self, amount: Asset) -> Result<()> {
        if self.state.return_pool.is_none() {
            self.state.return_pool = Some(ReturnPool::new(self.now, self.config));
        }
        self.update_rex_pool()?;
        if let Some(rp) = self.state.return_pool.as_mut() {
            rp.add(
                self.now,
                amount.amount,
                &mut self.state.return_buckets,
                self.config,
            )?;
        }
        Ok(())
    }

    /// Moves `amount` from `from` into REX custody and the return pool.
    ///
    /// When no shares exist the tokens stay with `from`; that is an error
    /// only if `required`.
    pub fn channel_to_rex(&mut self, from: Name, amount: Asset, required: bool) -> Result<()> {
        if self.rex_available() {
            self.add_to_return_pool(amount)?;
            let memo = format!("transfer from {from} to {REX_ACCOUNT}");
            self.host.transfer(from, REX_ACCOUNT, amount, &memo)?;
            return Ok(());
        }
        if required {
            return Err(RexError::NotInitialized("rex system not initialized yet"));
        }
        Ok(())
    }

    /// Maturity date for shares bought now.
    pub fn rex_maturity(&self) -> TimePointSec {
        let days = self.state.maturity_settings(self.config).num_of_maturity_buckets;
        self.now.end_of_day().plus_days(days)
    }

    /// Fails unless the configured voting requirement is met.
    pub fn check_voting_requirement(&self, owner: Name) -> Result<()> {
        if self.config.require_voting
            && !self
                .host
                .meets_rex_requirement(owner, self.config.min_producer_votes)
        {
            return Err(RexError::rejected(format!(
                "must vote for at least {} producers or for a proxy before buying REX",
                self.config.min_producer_votes
            )));
        }
        Ok(())
    }

    /// Adds `payment` to the pool, creating it on first use, and returns the
    /// shares minted.
    pub fn add_to_rex_pool(&mut self, payment: Asset) -> Result<i64> {
        if self.state.pool.is_none() {
            self.state.pool = Some(RexPool::new(payment.symbol, self.config));
        }
        if self.state.return_pool.is_none() {
            self.state.return_pool = Some(ReturnPool::new(self.now, self.config));
        }
        let config = self.config;
        self.pool_mut()?.add_lendable(payment.amount, config)
    }

    /// Credits `rex_received` shares bought with `payment` and returns the
    /// change in vote stake.
    pub fn add_to_rex_balance(
        &mut self,
        owner: Name,
        payment: Asset,
        rex_received: i64,
    ) -> Result<i64> {
        let maturity = self.rex_maturity();
        let to_savings = self.state.maturity_settings(self.config).buy_rex_to_savings;
        let (lendable, total_rex) = {
            let pool = self.pool()?;
            (pool.total_lendable.amount, pool.total_rex.amount)
        };
        let now = self.now;

        let (row, init_stake) = match self.state.balances.entry(owner) {
            Entry::Vacant(v) => {
                let row = v.insert(RexBalance::new(owner, payment.symbol));
                row.vote_stake = payment;
                row.rex_balance.amount = rex_received;
                (row, 0)
            }
            Entry::Occupied(o) => {
                let row = o.into_mut();
                let init = row.vote_stake.amount;
                row.rex_balance.amount += rex_received;
                row.vote_stake.amount =
                    mul_div(row.rex_balance.amount, lendable, total_rex)?;
                (row, init)
            }
        };

        row.process_maturities(now);
        if to_savings {
            let savings = row.savings();
            row.put_savings(savings + rex_received);
        } else {
            row.add_maturing(maturity, rex_received);
        }
        Ok(row.vote_stake.amount - init_stake)
    }

    /// Matures due buckets of `owner`.
    pub fn process_rex_maturities(&mut self, owner: Name) {
        let now = self.now;
        if let Some(row) = self.state.balances.get_mut(&owner) {
            row.process_maturities(now);
        }
    }

    /// Tries to sell `rex` shares of `owner` against unlent liquidity.
    pub fn fill_rex_order(&mut self, owner: Name, rex: i64) -> Result<FillResult> {
        let owned = self
            .state
            .balances
            .get(&owner)
            .map(|b| b.rex_balance.amount)
            .ok_or_else(|| RexError::not_found("user must first buyrex"))?;
        let config = self.config;
        let redemption = self.pool_mut()?.redeem(rex, owned, config)?;
        if !redemption.filled {
            return Ok(FillResult {
                success: false,
                proceeds: redemption.proceeds,
                stake_change: 0,
            });
        }
        let row = self
            .state
            .balances
            .get_mut(&owner)
            .ok_or_else(|| RexError::not_found("user must first buyrex"))?;
        let init_stake = row.vote_stake.amount;
        row.vote_stake.amount = redemption.stake_value - redemption.proceeds;
        row.rex_balance.amount -= rex;
        row.matured_rex -= rex;
        Ok(FillResult {
            success: true,
            proceeds: redemption.proceeds,
            stake_change: row.vote_stake.amount - init_stake,
        })
    }
}
