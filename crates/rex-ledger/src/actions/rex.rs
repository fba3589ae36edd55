//! Share purchase, sale, maturity and account actions.

use rex_core::{Asset, Name, REX_SYMBOL};
use tracing::info;

use crate::actions::exec::auto_drain;
use crate::bancor::mul_div;
use crate::context::Context;
use crate::engine::RexNotice;
use crate::error::{RexError, Result};
use crate::host::{Host, REX_ACCOUNT, STAKE_ACCOUNT};
use crate::state::RexMaturity;

fn require_rex(rex: Asset) -> Result<()> {
    if rex.symbol != REX_SYMBOL {
        return Err(RexError::SymbolMismatch {
            context: "asset must be REX",
            expected: REX_SYMBOL,
            actual: rex.symbol,
        });
    }
    if rex.amount <= 0 {
        return Err(RexError::invalid_quantity(
            "asset must be a positive amount of (REX, 4)",
        ));
    }
    Ok(())
}

fn require_balance<H: Host>(ctx: &Context<'_, H>, owner: Name) -> Result<()> {
    if ctx.state.balances.contains_key(&owner) {
        Ok(())
    } else {
        Err(RexError::not_found("account has no REX balance"))
    }
}

/// Buys shares with tokens from the buyer's REX fund.
pub fn buyrex<H: Host>(ctx: &mut Context<'_, H>, from: Name, amount: Asset) -> Result<()> {
    ctx.require_core(amount, "asset must be core token")?;
    if amount.amount <= 0 {
        return Err(RexError::invalid_quantity("must use positive amount"));
    }
    ctx.check_voting_requirement(from)?;
    ctx.transfer_from_fund(from, amount)?;
    let rex_received = ctx.add_to_rex_pool(amount)?;
    let delta_stake = ctx.add_to_rex_balance(from, amount, rex_received)?;
    auto_drain(ctx)?;
    ctx.update_rex_account(from, 0, delta_stake, false)?;

    let rex_received = Asset::new(rex_received, REX_SYMBOL);
    ctx.emit(RexNotice::BuyResult { rex_received });
    info!(owner = %from, amount = %amount, rex = %rex_received, "REX bought");
    Ok(())
}

/// Buys shares with tokens currently staked to `receiver`.
pub fn unstaketorex<H: Host>(
    ctx: &mut Context<'_, H>,
    owner: Name,
    receiver: Name,
    from_net: Asset,
    from_cpu: Asset,
) -> Result<()> {
    ctx.require_core(from_net, "asset must be core token")?;
    ctx.require_core(from_cpu, "asset must be core token")?;
    if from_net.amount < 0 || from_cpu.amount < 0 || from_net.amount + from_cpu.amount <= 0 {
        return Err(RexError::invalid_quantity(
            "must unstake a positive amount to buy rex",
        ));
    }
    ctx.check_voting_requirement(owner)?;
    ctx.host.undelegate(owner, receiver, from_net, from_cpu)?;

    let payment = from_net.checked_add(from_cpu)?;
    ctx.host
        .transfer(STAKE_ACCOUNT, REX_ACCOUNT, payment, "buy REX with staked tokens")?;
    let rex_received = ctx.add_to_rex_pool(payment)?;
    let delta_stake = ctx.add_to_rex_balance(owner, payment, rex_received)?;
    auto_drain(ctx)?;
    ctx.update_rex_account(owner, 0, delta_stake - payment.amount, true)?;

    let rex_received = Asset::new(rex_received, REX_SYMBOL);
    ctx.emit(RexNotice::BuyResult { rex_received });
    info!(owner = %owner, payment = %payment, rex = %rex_received, "staked tokens moved to REX");
    Ok(())
}

/// Sells matured shares now, or queues the sale if liquidity is short.
pub fn sellrex<H: Host>(ctx: &mut Context<'_, H>, from: Name, rex: Asset) -> Result<()> {
    require_rex(rex)?;
    if !ctx.state.balances.contains_key(&from) {
        return Err(RexError::not_found("user must first buyrex"));
    }
    auto_drain(ctx)?;
    ctx.process_rex_maturities(from);
    let matured = ctx.state.balances.get(&from).map_or(0, |b| b.matured_rex);
    if rex.amount > matured {
        return Err(RexError::insufficient("insufficient available rex"));
    }

    let fill = ctx.fill_rex_order(from, rex.amount)?;
    let proceeds = if fill.success { fill.proceeds } else { 0 };
    let mut pending = ctx.update_rex_account(from, proceeds, fill.stake_change, false)?;

    let core = ctx.core_symbol()?;
    if !fill.success {
        let now = ctx.now;
        let order = if ctx.state.orders.get(from).is_some() {
            ctx.state.orders.add_to_open(from, rex.amount)?
        } else {
            ctx.state.orders.open(from, rex.amount, core, now)?
        };
        pending = order.rex_requested.amount;
        info!(owner = %from, rex = %rex, queued = pending, "sell order queued");
    }

    let matured = ctx.state.balances.get(&from).map_or(0, |b| b.matured_rex);
    if pending > matured {
        return Err(RexError::insufficient(
            "insufficient funds for current and scheduled orders",
        ));
    }
    if fill.success {
        let proceeds = Asset::new(fill.proceeds, core);
        ctx.emit(RexNotice::SellResult { proceeds });
        info!(owner = %from, rex = %rex, proceeds = %proceeds, "REX sold");
    }
    Ok(())
}

/// Cancels an order that has not been filled.
pub fn cnclrexorder<H: Host>(ctx: &mut Context<'_, H>, owner: Name) -> Result<()> {
    let order = ctx
        .state
        .orders
        .get(owner)
        .ok_or_else(|| RexError::not_found("no sellrex order is scheduled"))?;
    if !order.is_open {
        return Err(RexError::rejected(
            "sellrex order has been filled and cannot be canceled",
        ));
    }
    ctx.state.orders.remove(owner);
    info!(owner = %owner, "sell order canceled");
    Ok(())
}

/// Rebases vote stake to the current share value.
pub fn updaterex<H: Host>(ctx: &mut Context<'_, H>, owner: Name) -> Result<()> {
    auto_drain(ctx)?;
    require_balance(ctx, owner)?;
    let (lendable, total_rex) = {
        let pool = ctx.pool()?;
        (pool.total_lendable.amount, pool.total_rex.amount)
    };
    let now = ctx.now;
    let Some(row) = ctx.state.balances.get_mut(&owner) else {
        return Err(RexError::not_found("account has no REX balance"));
    };
    let init_stake = row.vote_stake.amount;
    let current = if total_rex > 0 {
        mul_div(row.rex_balance.amount, lendable, total_rex)?
    } else {
        0
    };
    row.vote_stake.amount = current;
    ctx.update_rex_account(owner, 0, current - init_stake, true)?;
    if let Some(row) = ctx.state.balances.get_mut(&owner) {
        row.process_maturities(now);
    }
    Ok(())
}

/// Merges all maturing shares into one bucket.
pub fn consolidate<H: Host>(ctx: &mut Context<'_, H>, owner: Name) -> Result<()> {
    auto_drain(ctx)?;
    require_balance(ctx, owner)?;
    let reserved = ctx.update_rex_account(owner, 0, 0, false)?;
    let maturity = ctx.rex_maturity();
    let now = ctx.now;
    if let Some(row) = ctx.state.balances.get_mut(&owner) {
        row.process_maturities(now);
        row.consolidate(reserved, maturity);
    }
    Ok(())
}

/// Moves shares into savings.
pub fn mvtosavings<H: Host>(ctx: &mut Context<'_, H>, owner: Name, rex: Asset) -> Result<()> {
    auto_drain(ctx)?;
    require_balance(ctx, owner)?;
    require_rex(rex)?;
    let reserved = ctx.update_rex_account(owner, 0, 0, false)?;
    let now = ctx.now;
    let row = ctx
        .state
        .balances
        .get_mut(&owner)
        .ok_or_else(|| RexError::not_found("account has no REX balance"))?;
    row.process_maturities(now);
    row.move_to_savings(rex.amount, reserved)
}

/// Moves shares out of savings; they mature again from now.
pub fn mvfrsavings<H: Host>(ctx: &mut Context<'_, H>, owner: Name, rex: Asset) -> Result<()> {
    auto_drain(ctx)?;
    require_balance(ctx, owner)?;
    require_rex(rex)?;
    let maturity = ctx.rex_maturity();
    let now = ctx.now;
    let row = ctx
        .state
        .balances
        .get_mut(&owner)
        .ok_or_else(|| RexError::not_found("account has no REX balance"))?;
    row.process_maturities(now);
    row.move_from_savings(rex.amount, maturity)?;
    ctx.update_rex_account(owner, 0, 0, false)?;
    Ok(())
}

/// Deletes the owner's empty fund and balance rows.
pub fn closerex<H: Host>(ctx: &mut Context<'_, H>, owner: Name) -> Result<()> {
    auto_drain(ctx)?;
    if ctx.state.orders.get(owner).is_some() || ctx.state.balances.contains_key(&owner) {
        ctx.update_rex_account(owner, 0, 0, false)?;
    }

    let has_loans = ctx.state.cpu_loans.has_loans_from(owner)
        || ctx.state.net_loans.has_loans_from(owner);
    let empty_fund = ctx
        .state
        .funds
        .get(&owner)
        .is_some_and(|f| f.balance.amount == 0);
    if empty_fund && !has_loans {
        ctx.state.funds.remove(&owner);
    }

    if let Some(row) = ctx.state.balances.get(&owner) {
        if row.rex_balance.amount != 0 {
            return Err(RexError::rejected(
                "account has remaining REX balance, must sell first",
            ));
        }
        ctx.state.balances.remove(&owner);
    }
    info!(owner = %owner, "REX account closed");
    Ok(())
}

/// Sets the rent reserve.
pub fn setrex<H: Host>(ctx: &mut Context<'_, H>, balance: Asset) -> Result<()> {
    if balance.amount <= 0 {
        return Err(RexError::invalid_quantity(
            "balance must be set to have a positive amount",
        ));
    }
    ctx.require_core(balance, "balance symbol must be core symbol")?;
    let pool = ctx
        .state
        .pool
        .as_mut()
        .ok_or(RexError::NotInitialized("rex system is not initialized"))?;
    pool.total_rent = balance;
    info!(total_rent = %balance, "rent reserve set");
    Ok(())
}

/// Updates maturity settings.
pub fn setrexmature<H: Host>(
    ctx: &mut Context<'_, H>,
    num_of_maturity_buckets: Option<u32>,
    buy_rex_to_savings: Option<bool>,
) -> Result<()> {
    let mut settings: RexMaturity = ctx.state.maturity_settings(ctx.config);
    if let Some(n) = num_of_maturity_buckets {
        if n == 0 {
            return Err(RexError::invalid_quantity(
                "num_of_maturity_buckets must be positive",
            ));
        }
        if n > ctx.config.max_maturity_buckets {
            return Err(RexError::invalid_quantity(format!(
                "num_of_maturity_buckets must be less than or equal to {}",
                ctx.config.max_maturity_buckets
            )));
        }
        settings.num_of_maturity_buckets = n;
    }
    if let Some(to_savings) = buy_rex_to_savings {
        settings.buy_rex_to_savings = to_savings;
    }
    ctx.state.maturity = Some(settings);
    info!(
        buckets = settings.num_of_maturity_buckets,
        to_savings = settings.buy_rex_to_savings,
        "maturity settings updated"
    );
    Ok(())
}
