//! CPU and NET rentals against the unlent pool.

use rex_core::{Asset, Name};
use tracing::{debug, info};

use crate::actions::exec::auto_drain;
use crate::context::Context;
use crate::engine::RexNotice;
use crate::error::{RexError, Result};
use crate::host::Host;
use crate::loans::{Resource, RexLoan, REX_LOAN_VERSION};
use crate::pool::RexPool;

/// Rentals are offered only while the pool can price them.
fn loans_available<H: Host>(ctx: &Context<'_, H>) -> bool {
    ctx.state.pool.as_ref().is_some_and(RexPool::can_lend)
}

/// Rents `resource` to `receiver` for one loan period.
///
/// `loan_payment` prices this period; `loan_fund` is set aside for
/// automatic renewals.
pub fn rent<H: Host>(
    ctx: &mut Context<'_, H>,
    resource: Resource,
    from: Name,
    receiver: Name,
    loan_payment: Asset,
    loan_fund: Asset,
) -> Result<()> {
    auto_drain(ctx)?;
    if !loans_available(ctx) {
        return Err(RexError::Unavailable);
    }
    let core = ctx.require_core(loan_payment, "must use core token")?;
    ctx.require_core(loan_fund, "must use core token")?;
    if loan_payment.amount <= 0 || loan_fund.amount < 0 {
        return Err(RexError::invalid_quantity("must use positive asset amount"));
    }

    ctx.update_rex_account(from, 0, 0, false)?;
    let total = loan_payment.checked_add(loan_fund)?;
    ctx.transfer_from_fund(from, total)?;

    let pool = ctx.pool_mut()?;
    let rented = pool.rent_quote(loan_payment.amount);
    if loan_payment.amount >= rented {
        return Err(RexError::rejected("loan price does not favor renting"));
    }
    pool.add_loan(loan_payment.amount, rented, true)?;
    let loan_num = pool.loan_num;

    ctx.add_to_return_pool(loan_payment)?;
    let expiration = ctx.now.plus_days(ctx.config.loan_duration_days);
    ctx.state.loans_mut(resource).insert(RexLoan {
        version: REX_LOAN_VERSION,
        from,
        receiver,
        payment: loan_payment,
        balance: loan_fund,
        total_staked: Asset::new(rented, core),
        loan_num,
        expiration,
    })?;
    ctx.host.add_rented(receiver, resource, rented)?;

    let rented_tokens = Asset::new(rented, core);
    ctx.emit(RexNotice::RentResult { rented_tokens });
    info!(
        loan_num,
        %resource,
        from = %from,
        receiver = %receiver,
        payment = %loan_payment,
        rented = %rented_tokens,
        "loan created"
    );
    Ok(())
}

/// Loan of `from` that has not expired yet.
fn owned_live_loan<H: Host>(
    ctx: &Context<'_, H>,
    resource: Resource,
    from: Name,
    loan_num: u64,
) -> Result<RexLoan> {
    let loan = ctx
        .state
        .loans(resource)
        .get(loan_num)
        .ok_or_else(|| RexError::not_found("loan not found"))?;
    if loan.from != from {
        return Err(RexError::rejected("user must be loan creator"));
    }
    if loan.expiration <= ctx.now {
        return Err(RexError::rejected("loan has already expired"));
    }
    Ok(loan.clone())
}

/// Tops up the renewal balance of a loan from the creator's fund.
pub fn fund_loan<H: Host>(
    ctx: &mut Context<'_, H>,
    resource: Resource,
    from: Name,
    loan_num: u64,
    payment: Asset,
) -> Result<()> {
    ctx.require_core(payment, "must use core token")?;
    if payment.amount <= 0 {
        return Err(RexError::invalid_quantity("must use positive asset amount"));
    }
    owned_live_loan(ctx, resource, from, loan_num)?;
    ctx.transfer_from_fund(from, payment)?;
    ctx.state.loans_mut(resource).modify(loan_num, |loan| {
        loan.balance = loan.balance.checked_add(payment)?;
        Ok(())
    })?;
    debug!(loan_num, %resource, from = %from, payment = %payment, "loan funded");
    Ok(())
}

/// Returns part of a loan's renewal balance to the creator's fund.
pub fn defund_loan<H: Host>(
    ctx: &mut Context<'_, H>,
    resource: Resource,
    from: Name,
    loan_num: u64,
    amount: Asset,
) -> Result<()> {
    ctx.require_core(amount, "must use core token")?;
    if amount.amount <= 0 {
        return Err(RexError::invalid_quantity("must use positive asset amount"));
    }
    let loan = owned_live_loan(ctx, resource, from, loan_num)?;
    if loan.balance.amount < amount.amount {
        return Err(RexError::insufficient("insufficient loan balance"));
    }
    ctx.state.loans_mut(resource).modify(loan_num, |loan| {
        loan.balance = loan.balance.checked_sub(amount)?;
        Ok(())
    })?;
    ctx.transfer_to_fund(from, amount)?;
    debug!(loan_num, %resource, from = %from, amount = %amount, "loan defunded");
    Ok(())
}
