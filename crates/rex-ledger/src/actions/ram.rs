//! The RAM market: initialization, purchases, sales and burns.
//!
//! Tokens paid for RAM sit in `eosio.ram`; trading fees go to
//! `eosio.ramfee` and are channelled into REX when shares exist.

use rex_core::{Asset, Name, Symbol, RAM_SYMBOL};
use tracing::{debug, info};

use crate::bancor::{fee_bps, mul_div, RamMarket};
use crate::context::Context;
use crate::error::{RexError, Result};
use crate::host::{Host, NULL_ACCOUNT, RAMFEE_ACCOUNT, RAM_ACCOUNT};

/// Upper bound accepted by `setram`.
const MAX_REALISTIC_RAM: u64 = 1 << 40;

const BPS_DENOMINATOR: i64 = 10_000;

fn bytes_to_i64(bytes: u64) -> Result<i64> {
    i64::try_from(bytes).map_err(|_| RexError::invalid_quantity("ram size is unrealistic"))
}

fn market_mut<'c, H: Host>(ctx: &'c mut Context<'_, H>) -> Result<&'c mut RamMarket> {
    ctx.state
        .ram_market
        .as_mut()
        .ok_or(RexError::NotInitialized("system contract must first be initialized"))
}

/// Opens the RAM market against the core token.
pub fn init<H: Host>(ctx: &mut Context<'_, H>, core: Symbol) -> Result<()> {
    if ctx.state.ram_market.is_some() {
        return Err(RexError::rejected("system contract has already been initialized"));
    }
    if ctx.host.core_symbol() != Some(core) {
        return Err(RexError::rejected(
            "specified core symbol does not exist (precision mismatch)",
        ));
    }
    let supply = ctx.host.supply_of(core);
    if supply.amount <= 0 {
        return Err(RexError::rejected("system token supply must be greater than 0"));
    }
    let base = bytes_to_i64(ctx.state.ram.free_ram())?;
    let quote = Asset::new(supply.amount / ctx.config.ram_quote_divisor, core);
    let market = RamMarket::new(base, quote)?;
    info!(core = %core, ram_bytes = base, quote = %quote, "ram market opened");
    ctx.state.ram_market = Some(market);
    Ok(())
}

/// Grows total RAM; the new bytes join the market reserve.
pub fn setram<H: Host>(ctx: &mut Context<'_, H>, max_ram_size: u64) -> Result<()> {
    let current = ctx.state.ram.max_ram_size;
    if max_ram_size <= current {
        return Err(RexError::rejected("ram may only be increased"));
    }
    if max_ram_size >= MAX_REALISTIC_RAM {
        return Err(RexError::rejected("ram size is unrealistic"));
    }
    if max_ram_size <= ctx.state.ram.total_ram_bytes_reserved {
        return Err(RexError::rejected("attempt to set max below reserved"));
    }
    let delta = bytes_to_i64(max_ram_size - current)?;
    if let Some(market) = ctx.state.ram_market.as_mut() {
        market.add_ram(delta);
    }
    ctx.state.ram.max_ram_size = max_ram_size;
    info!(max_ram_size, added = delta, "ram size increased");
    Ok(())
}

/// Spends `quant` core tokens, fee included, on RAM for `receiver`.
///
/// Returns the bytes bought.
pub fn buyram<H: Host>(
    ctx: &mut Context<'_, H>,
    payer: Name,
    receiver: Name,
    quant: Asset,
) -> Result<i64> {
    ctx.require_core(quant, "must buy ram with core token")?;
    if quant.amount <= 0 {
        return Err(RexError::invalid_quantity("must purchase a positive amount"));
    }
    let fee = fee_bps(quant.amount, ctx.config.ram_fee_bps);
    let net = Asset::new(quant.amount - fee, quant.symbol);
    if net.amount <= 0 {
        return Err(RexError::invalid_quantity("must purchase a positive amount"));
    }

    ctx.host.transfer(payer, RAM_ACCOUNT, net, "buy ram")?;
    if fee > 0 {
        let fee = Asset::new(fee, quant.symbol);
        ctx.host.transfer(payer, RAMFEE_ACCOUNT, fee, "ram fee")?;
        ctx.channel_to_rex(RAMFEE_ACCOUNT, fee, false)?;
    }

    let bytes = market_mut(ctx)?.convert(net, RAM_SYMBOL)?.amount;
    if bytes <= 0 {
        return Err(RexError::invalid_quantity("must reserve a positive amount"));
    }
    let ram = &mut ctx.state.ram;
    ram.total_ram_bytes_reserved = ram
        .total_ram_bytes_reserved
        .saturating_add(bytes.unsigned_abs());
    ram.total_ram_stake += net.amount;
    ctx.host.add_ram_bytes(receiver, bytes)?;

    info!(
        payer = %payer,
        receiver = %receiver,
        quant = %quant,
        fee,
        bytes,
        "ram bought"
    );
    Ok(bytes)
}

/// Buys exactly `bytes` of RAM for `receiver`, paying the fee on top.
pub fn buyrambytes<H: Host>(
    ctx: &mut Context<'_, H>,
    payer: Name,
    receiver: Name,
    bytes: i64,
) -> Result<()> {
    if bytes <= 0 {
        return Err(RexError::invalid_quantity("must purchase a positive amount"));
    }
    let core = ctx.core_symbol()?;
    let cost = market_mut(ctx)?.cost_of_bytes(bytes);
    let keep = BPS_DENOMINATOR - i64::from(ctx.config.ram_fee_bps);
    let gross = mul_div(cost, BPS_DENOMINATOR, keep)?;
    debug!(bytes, cost, gross, "ram bytes priced");
    buyram(ctx, payer, receiver, Asset::new(gross, core)).map(|_| ())
}

/// Buys RAM with `quantity` and burns it immediately.
pub fn buyramburn<H: Host>(
    ctx: &mut Context<'_, H>,
    payer: Name,
    quantity: Asset,
    memo: &str,
) -> Result<()> {
    let bytes = buyram(ctx, payer, payer, quantity)?;
    ramburn(ctx, payer, bytes, memo)
}

/// Sells `bytes` of RAM quota back to the market.
pub fn sellram<H: Host>(ctx: &mut Context<'_, H>, account: Name, bytes: i64) -> Result<()> {
    if bytes < 0 {
        return Err(RexError::invalid_quantity("cannot sell negative byte"));
    }
    let core = ctx.core_symbol()?;
    if ctx.host.ram_bytes(account) < bytes {
        return Err(RexError::insufficient("insufficient quota"));
    }

    let tokens_out = market_mut(ctx)?.convert(Asset::new(bytes, RAM_SYMBOL), core)?;
    if tokens_out.amount <= 1 {
        return Err(RexError::rejected(
            "token amount received from selling ram is too low",
        ));
    }
    let ram = &mut ctx.state.ram;
    ram.total_ram_bytes_reserved = ram
        .total_ram_bytes_reserved
        .saturating_sub(bytes.unsigned_abs());
    ram.total_ram_stake -= tokens_out.amount;
    if ram.total_ram_stake < 0 {
        return Err(RexError::invariant(
            "attempt to unstake more tokens than previously staked",
        ));
    }
    ctx.host.add_ram_bytes(account, -bytes)?;
    ctx.host.transfer(RAM_ACCOUNT, account, tokens_out, "sell ram")?;

    let fee = fee_bps(tokens_out.amount, ctx.config.ram_fee_bps);
    if fee > 0 {
        let fee = Asset::new(fee, core);
        ctx.host.transfer(account, RAMFEE_ACCOUNT, fee, "sell ram fee")?;
        ctx.channel_to_rex(RAMFEE_ACCOUNT, fee, false)?;
    }
    info!(account = %account, bytes, proceeds = %tokens_out, fee, "ram sold");
    Ok(())
}

/// Moves `bytes` of the owner's quota to the null account.
pub fn ramburn<H: Host>(
    ctx: &mut Context<'_, H>,
    owner: Name,
    bytes: i64,
    memo: &str,
) -> Result<()> {
    if bytes <= 0 {
        return Err(RexError::invalid_quantity("cannot reduce negative byte"));
    }
    ctx.host.add_ram_bytes(owner, -bytes)?;
    ctx.host.add_ram_bytes(NULL_ACCOUNT, bytes)?;
    info!(owner = %owner, bytes, memo, "ram burned");
    Ok(())
}
