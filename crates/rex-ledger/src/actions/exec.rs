//! The bounded drain: return-pool release, expired loans, queued sells.
//!
//! Each pass handles at most `max` loans per table and `max` orders, and
//! picks up where the previous pass stopped.

use rex_core::{Asset, REX_SYMBOL};
use tracing::{debug, info};

use crate::context::Context;
use crate::engine::{DrainReport, RexNotice};
use crate::error::{RexError, Result};
use crate::host::{Host, NAMES_ACCOUNT};
use crate::loans::Resource;

/// `rexexec`: a zero bound does nothing.
pub fn rexexec<H: Host>(ctx: &mut Context<'_, H>, max: u16) -> Result<()> {
    if max == 0 {
        return Ok(());
    }
    run_rex(ctx, max).map(|_| ())
}

/// Drain run implicitly by user actions once the pool exists.
pub fn auto_drain<H: Host>(ctx: &mut Context<'_, H>) -> Result<()> {
    if !ctx.rex_system_initialized() {
        return Ok(());
    }
    let batch = ctx.config.auto_exec_batch;
    run_rex(ctx, batch).map(|_| ())
}

/// Runs one drain pass and returns what it did.
///
/// # Errors
///
/// Returns error if the pool does not exist or a collaborator fails.
pub fn run_rex<H: Host>(ctx: &mut Context<'_, H>, max: u16) -> Result<DrainReport> {
    if !ctx.rex_system_initialized() {
        return Err(RexError::NotInitialized("rex system not initialized yet"));
    }
    ctx.update_rex_pool()?;

    let namebid = ctx.pool()?.namebid_proceeds;
    if namebid.amount > 0 && ctx.rex_available() {
        ctx.channel_to_rex(NAMES_ACCOUNT, namebid, false)?;
        ctx.pool_mut()?.namebid_proceeds.amount = 0;
    }

    let mut report = DrainReport::default();
    for resource in [Resource::Cpu, Resource::Net] {
        for _ in 0..max {
            let Some(loan_num) = ctx.state.loans(resource).next_expired(ctx.now) else {
                break;
            };
            if process_expired_loan(ctx, resource, loan_num)? {
                report.loans_renewed += 1;
            } else {
                report.loans_closed += 1;
            }
        }
    }

    for _ in 0..max {
        let Some(owner) = ctx.state.orders.oldest_open() else {
            break;
        };
        let rex = ctx
            .state
            .orders
            .get(owner)
            .map(|o| o.rex_requested.amount)
            .ok_or_else(|| RexError::invariant("order index out of step"))?;
        let fill = ctx.fill_rex_order(owner, rex)?;
        if !fill.success {
            // Later orders wait behind the oldest one.
            break;
        }
        ctx.state
            .orders
            .close(owner, fill.proceeds, fill.stake_change)?;
        let core = ctx.core_symbol()?;
        ctx.emit(RexNotice::OrderResult {
            owner,
            proceeds: Asset::new(fill.proceeds, core),
        });
        info!(
            owner = %owner,
            rex = %Asset::new(rex, REX_SYMBOL),
            proceeds = fill.proceeds,
            "sell order filled"
        );
        report.orders_filled += 1;
    }

    ctx.report.merge(report);
    Ok(report)
}

/// Renews or closes one expired loan. Returns true when renewed.
fn process_expired_loan<H: Host>(
    ctx: &mut Context<'_, H>,
    resource: Resource,
    loan_num: u64,
) -> Result<bool> {
    let loan = ctx
        .state
        .loans(resource)
        .get(loan_num)
        .cloned()
        .ok_or_else(|| RexError::not_found("loan not found"))?;
    let duration = ctx.config.loan_duration_days;

    let pool = ctx.pool_mut()?;
    pool.remove_loan(loan.total_staked.amount)?;

    if loan.payment.amount <= loan.balance.amount {
        let rented = pool.rent_quote(loan.payment.amount);
        pool.add_loan(loan.payment.amount, rented, false)?;
        ctx.state.loans_mut(resource).modify(loan_num, |l| {
            l.total_staked.amount = rented;
            l.expiration = l.expiration.plus_days(duration);
            l.balance = l.balance.checked_sub(l.payment)?;
            Ok(())
        })?;
        ctx.add_to_return_pool(loan.payment)?;
        let delta = rented - loan.total_staked.amount;
        if delta != 0 {
            ctx.host.add_rented(loan.receiver, resource, delta)?;
        }
        debug!(
            loan_num,
            %resource,
            from = %loan.from,
            rented,
            "loan renewed"
        );
        Ok(true)
    } else {
        ctx.state.loans_mut(resource).remove(loan_num);
        if loan.balance.amount > 0 {
            ctx.transfer_to_fund(loan.from, loan.balance)?;
        }
        ctx.host
            .add_rented(loan.receiver, resource, -loan.total_staked.amount)?;
        info!(
            loan_num,
            %resource,
            from = %loan.from,
            refund = %loan.balance,
            "loan closed"
        );
        Ok(false)
    }
}
