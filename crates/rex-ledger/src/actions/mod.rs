//! Action handlers.

pub mod exec;
pub mod fund;
pub mod ram;
pub mod rent;
pub mod rex;

use crate::context::Context;
use crate::engine::Action;
use crate::error::Result;
use crate::host::Host;
use crate::loans::Resource;

/// Routes an action to its handler.
pub(crate) fn dispatch<H: Host>(ctx: &mut Context<'_, H>, action: &Action) -> Result<()> {
    match action {
        Action::Init { core } => ram::init(ctx, *core),
        Action::SetRam { max_ram_size } => ram::setram(ctx, *max_ram_size),
        Action::BuyRam {
            payer,
            receiver,
            quant,
        } => ram::buyram(ctx, *payer, *receiver, *quant).map(|_| ()),
        Action::BuyRamBytes {
            payer,
            receiver,
            bytes,
        } => ram::buyrambytes(ctx, *payer, *receiver, *bytes),
        Action::BuyRamBurn {
            payer,
            quantity,
            memo,
        } => ram::buyramburn(ctx, *payer, *quantity, memo),
        Action::SellRam { account, bytes } => ram::sellram(ctx, *account, *bytes),
        Action::RamBurn { owner, bytes, memo } => ram::ramburn(ctx, *owner, *bytes, memo),
        Action::Deposit { owner, amount } => fund::deposit(ctx, *owner, *amount),
        Action::Withdraw { owner, amount } => fund::withdraw(ctx, *owner, *amount),
        Action::DonateToRex {
            payer,
            quantity,
            memo,
        } => fund::donatetorex(ctx, *payer, *quantity, memo),
        Action::BuyRex { from, amount } => rex::buyrex(ctx, *from, *amount),
        Action::UnstakeToRex {
            owner,
            receiver,
            from_net,
            from_cpu,
        } => rex::unstaketorex(ctx, *owner, *receiver, *from_net, *from_cpu),
        Action::SellRex { from, rex } => rex::sellrex(ctx, *from, *rex),
        Action::CnclRexOrder { owner } => rex::cnclrexorder(ctx, *owner),
        Action::UpdateRex { owner } => rex::updaterex(ctx, *owner),
        Action::Consolidate { owner } => rex::consolidate(ctx, *owner),
        Action::MvToSavings { owner, rex } => rex::mvtosavings(ctx, *owner, *rex),
        Action::MvFrSavings { owner, rex } => rex::mvfrsavings(ctx, *owner, *rex),
        Action::CloseRex { owner } => rex::closerex(ctx, *owner),
        Action::SetRex { balance } => rex::setrex(ctx, *balance),
        Action::SetRexMature {
            num_of_maturity_buckets,
            buy_rex_to_savings,
        } => rex::setrexmature(ctx, *num_of_maturity_buckets, *buy_rex_to_savings),
        Action::RentCpu {
            from,
            receiver,
            loan_payment,
            loan_fund,
        } => rent::rent(ctx, Resource::Cpu, *from, *receiver, *loan_payment, *loan_fund),
        Action::RentNet {
            from,
            receiver,
            loan_payment,
            loan_fund,
        } => rent::rent(ctx, Resource::Net, *from, *receiver, *loan_payment, *loan_fund),
        Action::FundCpuLoan {
            from,
            loan_num,
            payment,
        } => rent::fund_loan(ctx, Resource::Cpu, *from, *loan_num, *payment),
        Action::FundNetLoan {
            from,
            loan_num,
            payment,
        } => rent::fund_loan(ctx, Resource::Net, *from, *loan_num, *payment),
        Action::DefCpuLoan {
            from,
            loan_num,
            amount,
        } => rent::defund_loan(ctx, Resource::Cpu, *from, *loan_num, *amount),
        Action::DefNetLoan {
            from,
            loan_num,
            amount,
        } => rent::defund_loan(ctx, Resource::Net, *from, *loan_num, *amount),
        Action::RexExec { max, .. } => exec::rexexec(ctx, *max),
    }
}
