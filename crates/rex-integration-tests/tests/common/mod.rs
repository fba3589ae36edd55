//! Shared scenario harness.

#![allow(dead_code)]

use rex_core::{Asset, Name, REX_SYMBOL, Symbol, TimePointSec};
use rex_ledger::{
    Action, ActionOutcome, InMemoryHost, RAM_ACCOUNT, REX_ACCOUNT, RexConfig, RexEngine,
    RexError, RexNotice, RexPool, RexState, SYSTEM_ACCOUNT, TokenLedger,
};

pub const EOS: Symbol = Symbol::new_unchecked(4, "EOS");

/// 2020-09-13T12:26:40Z
pub const T0: u32 = 1_600_000_000;

pub fn n(s: &str) -> Name {
    s.parse().unwrap()
}

pub fn eos(amount: i64) -> Asset {
    Asset::new(amount, EOS)
}

pub fn rex(amount: i64) -> Asset {
    Asset::new(amount, REX_SYMBOL)
}

/// Config used by most scenarios: no voting requirement.
pub fn open_config() -> RexConfig {
    RexConfig {
        require_voting: false,
        ..RexConfig::default()
    }
}

pub struct Harness {
    pub engine: RexEngine<InMemoryHost>,
    pub now: TimePointSec,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(open_config())
    }

    /// Initialized RAM market; `whale` holds 2,000,000 EOS and `alice`,
    /// `bob`, `carol` hold 10,000 EOS each.
    pub fn with_config(config: RexConfig) -> Self {
        let mut host = InMemoryHost::new(EOS);
        host.issue(n("whale"), eos(2_000_000_0000)).unwrap();
        for who in ["alice", "bob", "carol"] {
            host.issue(n(who), eos(10_000_0000)).unwrap();
        }
        let mut harness = Self {
            engine: RexEngine::new(host, config),
            now: TimePointSec::from_secs(T0),
        };
        harness.ok(Action::Init { core: EOS });
        harness
    }

    pub fn apply(&mut self, action: &Action) -> rex_ledger::Result<ActionOutcome> {
        self.engine.apply(self.now, action.authorizer(), action)
    }

    /// Applies an action that must succeed, then checks token custody.
    pub fn ok(&mut self, action: Action) -> ActionOutcome {
        let outcome = self
            .apply(&action)
            .unwrap_or_else(|e| panic!("{} failed: {e}", action.name()));
        self.assert_custody();
        outcome
    }

    /// Applies an action that must fail and checks nothing changed.
    pub fn fail(&mut self, action: Action) -> RexError {
        let state = self.engine.state().clone();
        let host = self.engine.host().clone();
        let err = self.apply(&action).unwrap_err();
        assert_eq!(self.engine.state(), &state, "state changed by failed {}", action.name());
        assert_eq!(self.engine.host(), &host, "host changed by failed {}", action.name());
        err
    }

    pub fn advance_days(&mut self, days: u32) {
        self.now = self.now.plus_days(days);
    }

    pub fn advance_secs(&mut self, secs: u32) {
        self.now = self.now.plus_secs(secs);
    }

    pub fn at_day(&mut self, day: u32) {
        self.now = TimePointSec::from_secs(T0).plus_days(day);
    }

    pub fn state(&self) -> &RexState {
        self.engine.state()
    }

    pub fn host(&self) -> &InMemoryHost {
        self.engine.host()
    }

    pub fn pool(&self) -> &RexPool {
        self.state().pool.as_ref().unwrap()
    }

    /// Liquid token balance.
    pub fn balance(&self, who: &str) -> i64 {
        self.host().balance_of(n(who), EOS).amount
    }

    /// REX fund balance, zero without a row.
    pub fn fund(&self, who: &str) -> i64 {
        self.state().fund_balance(n(who)).map_or(0, |a| a.amount)
    }

    /// REX shares owned, zero without a row.
    pub fn shares(&self, who: &str) -> i64 {
        self.state()
            .balances
            .get(&n(who))
            .map_or(0, |b| b.rex_balance.amount)
    }

    pub fn deposit(&mut self, who: &str, amount: i64) {
        self.ok(Action::Deposit {
            owner: n(who),
            amount: eos(amount),
        });
    }

    /// Deposits and buys; returns the shares received.
    pub fn buy(&mut self, who: &str, amount: i64) -> i64 {
        self.deposit(who, amount);
        let outcome = self.ok(Action::BuyRex {
            from: n(who),
            amount: eos(amount),
        });
        match outcome.notices.as_slice() {
            [RexNotice::BuyResult { rex_received }] => rex_received.amount,
            other => panic!("unexpected notices {other:?}"),
        }
    }

    pub fn rexexec(&mut self, max: u16) -> ActionOutcome {
        self.ok(Action::RexExec {
            user: SYSTEM_ACCOUNT,
            max,
        })
    }

    /// Every token held by `eosio.rex` is owed to a fund, the pool, the
    /// return pool, a loan reserve or a filled order; `eosio.ram` holds
    /// exactly the RAM stake.
    pub fn assert_custody(&self) {
        let state = self.state();
        let host = self.host();
        let funds: i64 = state.funds.values().map(|f| f.balance.amount).sum();
        let lendable = state.pool.as_ref().map_or(0, |p| p.total_lendable.amount);
        let returns = state.return_pool.as_ref().map_or(0, |rp| rp.proceeds);
        let loans: i64 = state
            .cpu_loans
            .iter()
            .chain(state.net_loans.iter())
            .map(|l| l.balance.amount)
            .sum();
        let filled: i64 = state
            .orders
            .iter()
            .filter(|o| !o.is_open)
            .map(|o| o.proceeds.amount)
            .sum();
        assert_eq!(
            host.balance_of(REX_ACCOUNT, EOS).amount,
            funds + lendable + returns + loans + filled,
            "eosio.rex custody mismatch"
        );
        assert_eq!(
            host.balance_of(RAM_ACCOUNT, EOS).amount,
            state.ram.total_ram_stake,
            "eosio.ram custody mismatch"
        );
    }
}
