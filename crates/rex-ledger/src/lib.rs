//! # rex-ledger
//!
//! Resource exchange ledger: token holders lend core tokens to a shared pool
//! in exchange for REX shares, and renters lease CPU or NET from that pool
//! for a fixed period.
//!
//! This crate provides:
//!
//! - [`RexEngine`] — Transactional action engine over [`RexState`]
//! - [`RexPool`] — Share issuance, redemption and rent pricing
//! - [`ReturnPool`] — Smoothed release of rental proceeds into the pool
//! - [`LoanTable`] / [`OrderQueue`] — Indexed loan and sell-order tables
//! - [`RamMarket`] — Bancor market between RAM bytes and the core token
//! - [`Host`] — Token, resource and voting collaborators, with
//!   [`InMemoryHost`] for tests and tooling
//! - [`snapshot`] — JSON persistence with record-version upgrades
//!
//! ## Example
//!
//! ```rust
//! use rex_core::{Asset, Name, Symbol, TimePointSec};
//! use rex_ledger::{Action, InMemoryHost, RexConfig, RexEngine, SYSTEM_ACCOUNT};
//!
//! let eos = Symbol::new_unchecked(4, "EOS");
//! let alice = Name::new_unchecked("alice");
//!
//! let mut host = InMemoryHost::new(eos);
//! host.issue(alice, Asset::new(1_000_0000, eos)).unwrap();
//!
//! let config = RexConfig { require_voting: false, ..RexConfig::default() };
//! let mut engine = RexEngine::new(host, config);
//! let now = TimePointSec::from_secs(1_600_000_000);
//!
//! engine.apply(now, SYSTEM_ACCOUNT, &Action::Init { core: eos }).unwrap();
//! engine
//!     .apply(now, alice, &Action::Deposit { owner: alice, amount: Asset::new(100_0000, eos) })
//!     .unwrap();
//! engine
//!     .apply(now, alice, &Action::BuyRex { from: alice, amount: Asset::new(100_0000, eos) })
//!     .unwrap();
//!
//! assert_eq!(engine.state().balances[&alice].rex_balance.amount, 100_0000 * 10_000);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actions;
pub mod balance;
pub mod bancor;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod host;
pub mod loans;
pub mod orders;
pub mod pool;
pub mod return_pool;
pub mod sim;
pub mod snapshot;
pub mod state;

pub use balance::{MaturityBucket, RexBalance, RexFund};
pub use bancor::{RamMarket, RAMCORE_SUPPLY};
pub use config::RexConfig;
pub use context::{Context, FillResult};
pub use engine::{Action, ActionOutcome, DrainReport, RexEngine, RexNotice};
pub use error::{FailureClass, RexError, Result};
pub use host::{
    Host, ResourceLedger, TokenLedger, VoteRegistry, NAMES_ACCOUNT, NULL_ACCOUNT,
    RAMFEE_ACCOUNT, RAM_ACCOUNT, REX_ACCOUNT, STAKE_ACCOUNT, SYSTEM_ACCOUNT,
};
pub use loans::{LoanTable, Resource, RexLoan};
pub use orders::{OrderQueue, RexOrder};
pub use pool::RexPool;
pub use return_pool::{ReturnBucket, ReturnBuckets, ReturnPool};
pub use sim::InMemoryHost;
pub use state::{RamGlobals, RexMaturity, RexState};
