//! Collaborators the ledger calls out to.
//!
//! The token ledger, resource limits and voting live outside this crate.
//! The engine reaches them only through these traits, and clones the host
//! alongside its own state so a failed action leaves both untouched.

use rex_core::{Asset, Name, Symbol};

use crate::error::Result;
use crate::loans::Resource;

/// System contract account.
pub const SYSTEM_ACCOUNT: Name = Name::new_unchecked("eosio");
/// Custody of REX funds, pool tokens and loan reserves.
pub const REX_ACCOUNT: Name = Name::new_unchecked("eosio.rex");
/// Tokens paid for RAM.
pub const RAM_ACCOUNT: Name = Name::new_unchecked("eosio.ram");
/// RAM trading fees.
pub const RAMFEE_ACCOUNT: Name = Name::new_unchecked("eosio.ramfee");
/// Tokens staked for CPU and NET.
pub const STAKE_ACCOUNT: Name = Name::new_unchecked("eosio.stake");
/// Name-auction proceeds.
pub const NAMES_ACCOUNT: Name = Name::new_unchecked("eosio.names");
/// Burn sink for RAM.
pub const NULL_ACCOUNT: Name = Name::new_unchecked("eosio.null");

/// Fungible token balances.
pub trait TokenLedger {
    /// The chain's core token, if one has been issued.
    fn core_symbol(&self) -> Option<Symbol>;

    /// Total issued supply of `symbol`.
    fn supply_of(&self, symbol: Symbol) -> Asset;

    /// Balance of `owner` in `symbol`.
    fn balance_of(&self, owner: Name, symbol: Symbol) -> Asset;

    /// Moves `quantity` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if `from` cannot cover the transfer.
    fn transfer(&mut self, from: Name, to: Name, quantity: Asset, memo: &str) -> Result<()>;
}

/// Resource limits granted to accounts.
pub trait ResourceLedger {
    /// Adjusts the rented `resource` of `receiver` by `delta` tokens.
    ///
    /// # Errors
    ///
    /// Returns error if the rented amount would turn negative.
    fn add_rented(&mut self, receiver: Name, resource: Resource, delta: i64) -> Result<()>;

    /// RAM quota of `account` in bytes.
    fn ram_bytes(&self, account: Name) -> i64;

    /// Adjusts the RAM quota of `account`.
    ///
    /// # Errors
    ///
    /// Returns error if the quota would turn negative.
    fn add_ram_bytes(&mut self, account: Name, delta: i64) -> Result<()>;

    /// Removes stake delegated from `from` to `receiver`. The tokens remain
    /// in the stake account for the caller to move.
    ///
    /// # Errors
    ///
    /// Returns error if `from` is not delegating that much to `receiver`.
    fn undelegate(&mut self, from: Name, receiver: Name, net: Asset, cpu: Asset) -> Result<()>;
}

/// Producer voting.
pub trait VoteRegistry {
    /// True if `owner` votes for enough producers or through a proxy.
    fn meets_rex_requirement(&self, owner: Name, min_producers: usize) -> bool;

    /// Adds `delta` to the voter's stake and propagates the new weight to
    /// their producers or proxy.
    ///
    /// # Errors
    ///
    /// Returns error if the voter's stake would turn negative.
    fn update_voting_power(&mut self, voter: Name, delta: i64) -> Result<()>;
}

/// Everything the engine needs from the outside world.
pub trait Host: TokenLedger + ResourceLedger + VoteRegistry + Clone {}

impl<T> Host for T where T: TokenLedger + ResourceLedger + VoteRegistry + Clone {}
