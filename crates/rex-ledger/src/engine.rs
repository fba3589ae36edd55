//! Transactional action engine.
//!
//! [`RexEngine::apply`] runs one action against clones of the state and
//! host. The clones replace the originals only when the action and the
//! invariant check both succeed, so a failed action has no effect.

use rex_core::{Asset, Name, Symbol, TimePointSec};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::actions;
use crate::config::RexConfig;
use crate::context::Context;
use crate::error::{RexError, Result};
use crate::host::{Host, SYSTEM_ACCOUNT};
use crate::state::RexState;

/// An action and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Opens the RAM market for the core token.
    Init {
        /// Core token symbol.
        core: Symbol,
    },
    /// Grows total RAM.
    SetRam {
        /// New total in bytes.
        max_ram_size: u64,
    },
    /// Buys RAM for `receiver` with `quant` core tokens.
    BuyRam {
        /// Paying account.
        payer: Name,
        /// Account credited with the bytes.
        receiver: Name,
        /// Tokens spent, fee included.
        quant: Asset,
    },
    /// Buys an exact number of RAM bytes.
    BuyRamBytes {
        /// Paying account.
        payer: Name,
        /// Account credited with the bytes.
        receiver: Name,
        /// Bytes wanted.
        bytes: i64,
    },
    /// Buys RAM and burns it.
    BuyRamBurn {
        /// Paying account.
        payer: Name,
        /// Tokens spent, fee included.
        quantity: Asset,
        /// Memo.
        memo: String,
    },
    /// Sells RAM back to the market.
    SellRam {
        /// Selling account.
        account: Name,
        /// Bytes sold.
        bytes: i64,
    },
    /// Burns RAM quota.
    RamBurn {
        /// Owner of the quota.
        owner: Name,
        /// Bytes burned.
        bytes: i64,
        /// Memo.
        memo: String,
    },
    /// Moves tokens into the owner's REX fund.
    Deposit {
        /// Fund owner.
        owner: Name,
        /// Tokens deposited.
        amount: Asset,
    },
    /// Moves tokens out of the owner's REX fund.
    Withdraw {
        /// Fund owner.
        owner: Name,
        /// Tokens withdrawn.
        amount: Asset,
    },
    /// Buys REX with fund tokens.
    BuyRex {
        /// Buyer.
        from: Name,
        /// Tokens spent.
        amount: Asset,
    },
    /// Buys REX with staked tokens.
    UnstakeToRex {
        /// Delegator.
        owner: Name,
        /// Account the stake was delegated to.
        receiver: Name,
        /// NET stake used.
        from_net: Asset,
        /// CPU stake used.
        from_cpu: Asset,
    },
    /// Sells matured REX.
    SellRex {
        /// Seller.
        from: Name,
        /// Shares sold.
        rex: Asset,
    },
    /// Cancels an unfilled sell order.
    CnclRexOrder {
        /// Order owner.
        owner: Name,
    },
    /// Rents CPU.
    RentCpu {
        /// Paying account.
        from: Name,
        /// Account receiving CPU.
        receiver: Name,
        /// Rent for the first period.
        loan_payment: Asset,
        /// Reserve for renewals.
        loan_fund: Asset,
    },
    /// Rents NET.
    RentNet {
        /// Paying account.
        from: Name,
        /// Account receiving NET.
        receiver: Name,
        /// Rent for the first period.
        loan_payment: Asset,
        /// Reserve for renewals.
        loan_fund: Asset,
    },
    /// Adds to a CPU loan's renewal reserve.
    FundCpuLoan {
        /// Loan creator.
        from: Name,
        /// Loan number.
        loan_num: u64,
        /// Tokens added.
        payment: Asset,
    },
    /// Adds to a NET loan's renewal reserve.
    FundNetLoan {
        /// Loan creator.
        from: Name,
        /// Loan number.
        loan_num: u64,
        /// Tokens added.
        payment: Asset,
    },
    /// Withdraws from a CPU loan's renewal reserve.
    DefCpuLoan {
        /// Loan creator.
        from: Name,
        /// Loan number.
        loan_num: u64,
        /// Tokens withdrawn.
        amount: Asset,
    },
    /// Withdraws from a NET loan's renewal reserve.
    DefNetLoan {
        /// Loan creator.
        from: Name,
        /// Loan number.
        loan_num: u64,
        /// Tokens withdrawn.
        amount: Asset,
    },
    /// Rebases vote stake and settles orders.
    UpdateRex {
        /// Balance owner.
        owner: Name,
    },
    /// Runs the drain.
    RexExec {
        /// Caller.
        user: Name,
        /// Upper bound per queue.
        max: u16,
    },
    /// Sets the rent reserve.
    SetRex {
        /// New `total_rent`.
        balance: Asset,
    },
    /// Merges maturity buckets.
    Consolidate {
        /// Balance owner.
        owner: Name,
    },
    /// Moves REX into savings.
    MvToSavings {
        /// Balance owner.
        owner: Name,
        /// Shares moved.
        rex: Asset,
    },
    /// Moves REX out of savings.
    MvFrSavings {
        /// Balance owner.
        owner: Name,
        /// Shares moved.
        rex: Asset,
    },
    /// Deletes empty fund and balance rows.
    CloseRex {
        /// Row owner.
        owner: Name,
    },
    /// Changes maturity settings.
    SetRexMature {
        /// Days until purchases mature.
        num_of_maturity_buckets: Option<u32>,
        /// Place purchases directly into savings.
        buy_rex_to_savings: Option<bool>,
    },
    /// Donates tokens to REX holders.
    DonateToRex {
        /// Donor.
        payer: Name,
        /// Tokens donated.
        quantity: Asset,
        /// Memo.
        memo: String,
    },
}

impl Action {
    /// Account whose authority the action requires.
    #[must_use]
    pub const fn authorizer(&self) -> Name {
        match self {
            Self::Init { .. }
            | Self::SetRam { .. }
            | Self::SetRex { .. }
            | Self::SetRexMature { .. } => SYSTEM_ACCOUNT,
            Self::BuyRam { payer, .. }
            | Self::BuyRamBytes { payer, .. }
            | Self::BuyRamBurn { payer, .. }
            | Self::DonateToRex { payer, .. } => *payer,
            Self::SellRam { account, .. } => *account,
            Self::Deposit { owner, .. }
            | Self::Withdraw { owner, .. }
            | Self::UnstakeToRex { owner, .. }
            | Self::CnclRexOrder { owner }
            | Self::UpdateRex { owner }
            | Self::Consolidate { owner }
            | Self::MvToSavings { owner, .. }
            | Self::MvFrSavings { owner, .. }
            | Self::CloseRex { owner }
            | Self::RamBurn { owner, .. } => *owner,
            Self::BuyRex { from, .. }
            | Self::SellRex { from, .. }
            | Self::RentCpu { from, .. }
            | Self::RentNet { from, .. }
            | Self::FundCpuLoan { from, .. }
            | Self::FundNetLoan { from, .. }
            | Self::DefCpuLoan { from, .. }
            | Self::DefNetLoan { from, .. } => *from,
            Self::RexExec { user, .. } => *user,
        }
    }

    /// Action name as used on chain.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::SetRam { .. } => "setram",
            Self::BuyRam { .. } => "buyram",
            Self::BuyRamBytes { .. } => "buyrambytes",
            Self::BuyRamBurn { .. } => "buyramburn",
            Self::SellRam { .. } => "sellram",
            Self::RamBurn { .. } => "ramburn",
            Self::Deposit { .. } => "deposit",
            Self::Withdraw { .. } => "withdraw",
            Self::BuyRex { .. } => "buyrex",
            Self::UnstakeToRex { .. } => "unstaketorex",
            Self::SellRex { .. } => "sellrex",
            Self::CnclRexOrder { .. } => "cnclrexorder",
            Self::RentCpu { .. } => "rentcpu",
            Self::RentNet { .. } => "rentnet",
            Self::FundCpuLoan { .. } => "fundcpuloan",
            Self::FundNetLoan { .. } => "fundnetloan",
            Self::DefCpuLoan { .. } => "defcpuloan",
            Self::DefNetLoan { .. } => "defnetloan",
            Self::UpdateRex { .. } => "updaterex",
            Self::RexExec { .. } => "rexexec",
            Self::SetRex { .. } => "setrex",
            Self::Consolidate { .. } => "consolidate",
            Self::MvToSavings { .. } => "mvtosavings",
            Self::MvFrSavings { .. } => "mvfrsavings",
            Self::CloseRex { .. } => "closerex",
            Self::SetRexMature { .. } => "setrexmature",
            Self::DonateToRex { .. } => "donatetorex",
        }
    }
}

/// Result records for off-chain observers. They carry no state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "lowercase")]
pub enum RexNotice {
    /// Shares received by a purchase.
    BuyResult {
        /// Shares minted.
        rex_received: Asset,
    },
    /// Proceeds of an immediately filled sale.
    SellResult {
        /// Core tokens credited.
        proceeds: Asset,
    },
    /// Tokens delegated by a new rental.
    RentResult {
        /// Tokens rented.
        rented_tokens: Asset,
    },
    /// A queued order filled during a drain.
    OrderResult {
        /// Order owner.
        owner: Name,
        /// Proceeds owed.
        proceeds: Asset,
    },
}

/// Work done by drains during one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Expired loans renewed.
    pub loans_renewed: u32,
    /// Expired loans closed.
    pub loans_closed: u32,
    /// Queued orders filled.
    pub orders_filled: u32,
}

impl DrainReport {
    /// Adds another report's counts.
    pub fn merge(&mut self, other: Self) {
        self.loans_renewed += other.loans_renewed;
        self.loans_closed += other.loans_closed;
        self.orders_filled += other.orders_filled;
    }

    /// Total items processed.
    #[must_use]
    pub const fn processed(&self) -> u32 {
        self.loans_renewed + self.loans_closed + self.orders_filled
    }
}

/// What a committed action produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Result records in emission order.
    pub notices: Vec<RexNotice>,
    /// Drain work performed.
    pub report: DrainReport,
}

/// The ledger with its collaborators.
#[derive(Debug, Clone)]
pub struct RexEngine<H: Host> {
    state: RexState,
    host: H,
    config: RexConfig,
}

impl<H: Host> RexEngine<H> {
    /// Engine with fresh state.
    pub fn new(host: H, config: RexConfig) -> Self {
        Self {
            state: RexState::new(&config),
            host,
            config,
        }
    }

    /// Engine over existing state.
    pub const fn from_parts(state: RexState, host: H, config: RexConfig) -> Self {
        Self {
            state,
            host,
            config,
        }
    }

    /// Splits the engine into its parts.
    pub fn into_parts(self) -> (RexState, H, RexConfig) {
        (self.state, self.host, self.config)
    }

    /// Committed state.
    pub const fn state(&self) -> &RexState {
        &self.state
    }

    /// Committed host.
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Host access outside any action, for setting up collaborators.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Ledger parameters.
    pub const fn config(&self) -> &RexConfig {
        &self.config
    }

    /// Applies `action` signed by `signer` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::MissingAuth`] if `signer` is not the action's
    /// authorizer, or whatever error aborted the action. The engine is
    /// unchanged on error.
    pub fn apply(&mut self, now: TimePointSec, signer: Name, action: &Action) -> Result<ActionOutcome> {
        let required = action.authorizer();
        if signer != required {
            warn!(action = action.name(), signer = %signer, "missing authority");
            return Err(RexError::MissingAuth(required));
        }
        self.transact(now, action.name(), |ctx| actions::dispatch(ctx, action))
    }

    /// Credits name-auction proceeds already held by the names account.
    ///
    /// # Errors
    ///
    /// Returns error if no REX pool exists or the amount is invalid.
    pub fn channel_namebid(&mut self, now: TimePointSec, amount: Asset) -> Result<ActionOutcome> {
        self.transact(now, "channel_namebid", |ctx| actions::fund::channel_namebid(ctx, amount))
    }

    /// Runs `f` against working copies and commits them on success.
    fn transact<F>(&mut self, now: TimePointSec, label: &str, f: F) -> Result<ActionOutcome>
    where
        F: FnOnce(&mut Context<'_, H>) -> Result<()>,
    {
        let mut state = self.state.clone();
        let mut host = self.host.clone();
        let result = Self::execute(&mut state, &mut host, &self.config, now, f);
        match result {
            Ok(outcome) => {
                self.state = state;
                self.host = host;
                info!(
                    action = label,
                    at = %now,
                    notices = outcome.notices.len(),
                    drained = outcome.report.processed(),
                    "action committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(action = label, at = %now, error = %e, "action aborted");
                Err(e)
            }
        }
    }

    fn execute<F>(
        state: &mut RexState,
        host: &mut H,
        config: &RexConfig,
        now: TimePointSec,
        f: F,
    ) -> Result<ActionOutcome>
    where
        F: FnOnce(&mut Context<'_, H>) -> Result<()>,
    {
        let mut ctx = Context::new(state, host, config, now);
        f(&mut ctx)?;
        ctx.state.check_invariants()?;
        Ok(ActionOutcome {
            notices: ctx.notices,
            report: ctx.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::InMemoryHost;

    #[test]
    fn test_action_serde_uses_chain_names() {
        let action = Action::RexExec {
            user: Name::new_unchecked("alice"),
            max: 5,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "rexexec");
        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
        assert_eq!(back.name(), "rexexec");
    }

    #[test]
    fn test_system_actions_need_system_authority() {
        let action = Action::SetRexMature {
            num_of_maturity_buckets: Some(4),
            buy_rex_to_savings: None,
        };
        assert_eq!(action.authorizer(), SYSTEM_ACCOUNT);
    }

    #[test]
    fn test_drain_report_merge() {
        let mut a = DrainReport {
            loans_renewed: 1,
            loans_closed: 0,
            orders_filled: 2,
        };
        a.merge(DrainReport {
            loans_renewed: 0,
            loans_closed: 3,
            orders_filled: 1,
        });
        assert_eq!(a.processed(), 7);
    }

    fn engine() -> RexEngine<InMemoryHost> {
        let eos = Symbol::new_unchecked(4, "EOS");
        let mut host = InMemoryHost::new(eos);
        host.issue(Name::new_unchecked("alice"), Asset::new(100_0000, eos))
            .unwrap();
        let config = RexConfig {
            require_voting: false,
            ..RexConfig::default()
        };
        let mut engine = RexEngine::new(host, config);
        let init = Action::Init { core: eos };
        engine
            .apply(TimePointSec::from_secs(0), SYSTEM_ACCOUNT, &init)
            .unwrap();
        engine
    }

    #[test]
    fn test_wrong_signer_is_rejected() {
        let mut engine = engine();
        let alice = Name::new_unchecked("alice");
        let action = Action::Deposit {
            owner: alice,
            amount: "1.0000 EOS".parse().unwrap(),
        };
        let err = engine
            .apply(TimePointSec::from_secs(0), SYSTEM_ACCOUNT, &action)
            .unwrap_err();
        assert!(matches!(err, RexError::MissingAuth(who) if who == alice));
        assert!(engine.state().funds.is_empty());
    }

    #[test]
    fn test_failed_action_rolls_back() {
        let mut engine = engine();
        let alice = Name::new_unchecked("alice");
        let deposit = Action::Deposit {
            owner: alice,
            amount: "10.0000 EOS".parse().unwrap(),
        };
        engine
            .apply(TimePointSec::from_secs(0), alice, &deposit)
            .unwrap();

        let state = engine.state().clone();
        let host = engine.host().clone();
        let buy = Action::BuyRex {
            from: alice,
            amount: "11.0000 EOS".parse().unwrap(),
        };
        assert!(engine.apply(TimePointSec::from_secs(0), alice, &buy).is_err());
        assert_eq!(engine.state(), &state);
        assert_eq!(engine.host(), &host);
    }
}
