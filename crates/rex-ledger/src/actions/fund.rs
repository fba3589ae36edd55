//! REX fund movements and donations.

use rex_core::{Asset, Name};
use tracing::info;

use crate::actions::exec::auto_drain;
use crate::context::Context;
use crate::error::{RexError, Result};
use crate::host::{Host, REX_ACCOUNT};

/// Moves tokens from the owner's balance into their REX fund.
pub fn deposit<H: Host>(ctx: &mut Context<'_, H>, owner: Name, amount: Asset) -> Result<()> {
    ctx.require_core(amount, "must deposit core token")?;
    if amount.amount <= 0 {
        return Err(RexError::invalid_quantity("must deposit a positive amount"));
    }
    ctx.host
        .transfer(owner, REX_ACCOUNT, amount, "deposit to REX fund")?;
    ctx.transfer_to_fund(owner, amount)?;
    info!(owner = %owner, amount = %amount, "deposited to REX fund");
    Ok(())
}

/// Moves tokens from the owner's REX fund back to their balance, after
/// settling any filled sell order.
pub fn withdraw<H: Host>(ctx: &mut Context<'_, H>, owner: Name, amount: Asset) -> Result<()> {
    ctx.require_core(amount, "must withdraw core token")?;
    if amount.amount <= 0 {
        return Err(RexError::invalid_quantity("must withdraw a positive amount"));
    }
    auto_drain(ctx)?;
    ctx.update_rex_account(owner, 0, 0, false)?;
    ctx.transfer_from_fund(owner, amount)?;
    ctx.host
        .transfer(REX_ACCOUNT, owner, amount, "withdraw from REX fund")?;
    info!(owner = %owner, amount = %amount, "withdrew from REX fund");
    Ok(())
}

/// Gives tokens to REX holders through the return pool.
pub fn donatetorex<H: Host>(
    ctx: &mut Context<'_, H>,
    payer: Name,
    quantity: Asset,
    memo: &str,
) -> Result<()> {
    if !ctx.rex_system_initialized() {
        return Err(RexError::NotInitialized("rex system not initialized yet"));
    }
    ctx.require_core(quantity, "quantity must be core token")?;
    if quantity.amount <= 0 {
        return Err(RexError::invalid_quantity("quantity must be a positive amount"));
    }
    ctx.host.transfer(payer, REX_ACCOUNT, quantity, memo)?;
    ctx.add_to_return_pool(quantity)?;
    info!(payer = %payer, quantity = %quantity, "donated to REX");
    Ok(())
}

/// Records name-auction proceeds; the next drain moves them in.
pub fn channel_namebid<H: Host>(ctx: &mut Context<'_, H>, amount: Asset) -> Result<()> {
    ctx.require_core(amount, "name bid proceeds must be core token")?;
    if amount.amount <= 0 {
        return Err(RexError::invalid_quantity("name bid proceeds must be positive"));
    }
    let pool = ctx.pool_mut()?;
    pool.namebid_proceeds = pool.namebid_proceeds.checked_add(amount)?;
    Ok(())
}
