//! In-memory host used by tests and the CLI.
//!
//! Keeps token balances, stake delegations, RAM quotas and producer votes in
//! ordered maps so a whole world can be snapshotted as JSON. Vote weight is
//! the plain staked amount with no time decay.

use std::collections::BTreeMap;

use rex_core::{Asset, Name, Symbol};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RexError, Result};
use crate::host::{ResourceLedger, TokenLedger, VoteRegistry, STAKE_ACCOUNT};
use crate::loans::Resource;

/// Most producers a single voter may select.
pub const MAX_PRODUCERS_PER_VOTE: usize = 30;

/// Resources granted to one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResources {
    /// Tokens staked toward NET by any delegator.
    pub net_weight: i64,
    /// Tokens staked toward CPU by any delegator.
    pub cpu_weight: i64,
    /// NET tokens rented from REX.
    pub rented_net: i64,
    /// CPU tokens rented from REX.
    pub rented_cpu: i64,
    /// RAM quota in bytes.
    pub ram_bytes: i64,
}

/// Stake one account delegates to another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// NET stake.
    pub net_weight: i64,
    /// CPU stake.
    pub cpu_weight: i64,
}

/// Voting record of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    /// Staked tokens plus REX vote stake.
    pub staked: i64,
    /// Producers voted for, sorted.
    pub producers: Vec<Name>,
    /// Proxy voting on this account's behalf.
    pub proxy: Option<Name>,
    /// Whether this account accepts proxied votes.
    pub is_proxy: bool,
    /// Weight proxied to this account.
    pub proxied_vote_weight: i64,
    /// Weight last applied to producers or proxy.
    pub last_vote_weight: i64,
}

impl Voter {
    const fn weight(&self) -> i64 {
        self.staked + self.proxied_vote_weight
    }
}

/// A host backed by ordered maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryHost {
    core: Symbol,
    supply: BTreeMap<Symbol, i64>,
    balances: BTreeMap<Symbol, BTreeMap<Name, i64>>,
    resources: BTreeMap<Name, UserResources>,
    delegations: BTreeMap<Name, BTreeMap<Name, Delegation>>,
    voters: BTreeMap<Name, Voter>,
    producer_votes: BTreeMap<Name, i64>,
}

impl InMemoryHost {
    /// Empty world whose core token is `core`.
    #[must_use]
    pub fn new(core: Symbol) -> Self {
        Self {
            core,
            supply: BTreeMap::new(),
            balances: BTreeMap::new(),
            resources: BTreeMap::new(),
            delegations: BTreeMap::new(),
            voters: BTreeMap::new(),
            producer_votes: BTreeMap::new(),
        }
    }

    /// Mints `quantity` to `to`.
    ///
    /// # Errors
    ///
    /// Returns error for a non-positive quantity or supply overflow.
    pub fn issue(&mut self, to: Name, quantity: Asset) -> Result<()> {
        if quantity.amount <= 0 || !quantity.is_valid() {
            return Err(RexError::Transfer("must issue positive quantity".into()));
        }
        let supply = self.supply.entry(quantity.symbol).or_insert(0);
        *supply = supply
            .checked_add(quantity.amount)
            .filter(|s| *s <= rex_core::MAX_ASSET_AMOUNT)
            .ok_or_else(|| RexError::Transfer("quantity exceeds available supply".into()))?;
        *self
            .balances
            .entry(quantity.symbol)
            .or_default()
            .entry(to)
            .or_insert(0) += quantity.amount;
        info!(to = %to, quantity = %quantity, "tokens issued");
        Ok(())
    }

    /// Stakes `net` and `cpu` from `from` toward `receiver`.
    ///
    /// # Errors
    ///
    /// Returns error if `from` cannot cover the stake.
    pub fn delegate(&mut self, from: Name, receiver: Name, net: Asset, cpu: Asset) -> Result<()> {
        if net.amount < 0 || cpu.amount < 0 || net.amount + cpu.amount <= 0 {
            return Err(RexError::invalid_quantity("must stake a positive amount"));
        }
        let total = net.checked_add(cpu)?;
        self.transfer(from, STAKE_ACCOUNT, total, "stake bandwidth")?;
        let del = self
            .delegations
            .entry(from)
            .or_default()
            .entry(receiver)
            .or_default();
        del.net_weight += net.amount;
        del.cpu_weight += cpu.amount;
        let res = self.resources.entry(receiver).or_default();
        res.net_weight += net.amount;
        res.cpu_weight += cpu.amount;
        self.update_voting_power(from, total.amount)?;
        info!(from = %from, receiver = %receiver, net = %net, cpu = %cpu, "stake delegated");
        Ok(())
    }

    /// Marks `account` as accepting proxied votes.
    pub fn register_proxy(&mut self, account: Name) {
        self.voters.entry(account).or_default().is_proxy = true;
    }

    /// Votes for `producers`, or through `proxy` when given.
    ///
    /// # Errors
    ///
    /// Returns error for an invalid producer list or an unregistered proxy.
    pub fn vote(&mut self, voter: Name, proxy: Option<Name>, producers: Vec<Name>) -> Result<()> {
        let mut producers = producers;
        if let Some(proxy) = proxy {
            if !producers.is_empty() {
                return Err(RexError::rejected("cannot vote for producers and proxy at same time"));
            }
            if proxy == voter {
                return Err(RexError::rejected("cannot proxy to self"));
            }
            if self.voters.get(&voter).is_some_and(|v| v.is_proxy) {
                return Err(RexError::rejected(
                    "account registered as a proxy is not allowed to use a proxy",
                ));
            }
            if !self.voters.get(&proxy).is_some_and(|v| v.is_proxy) {
                return Err(RexError::rejected("invalid proxy specified"));
            }
        } else {
            if producers.len() > MAX_PRODUCERS_PER_VOTE {
                return Err(RexError::rejected("attempt to vote for too many producers"));
            }
            producers.sort_unstable();
            let before = producers.len();
            producers.dedup();
            if producers.len() != before {
                return Err(RexError::rejected("producer votes must be unique"));
            }
        }

        // Withdraw the previous weight from the previous targets.
        let old = self.voters.entry(voter).or_default().clone();
        if let Some(old_proxy) = old.proxy {
            self.add_proxied(old_proxy, -old.last_vote_weight)?;
        } else {
            for p in &old.producers {
                *self.producer_votes.entry(*p).or_insert(0) -= old.last_vote_weight;
            }
        }

        let row = self.voters.entry(voter).or_default();
        row.proxy = proxy;
        row.producers = producers;
        row.last_vote_weight = 0;
        self.propagate(voter)?;
        debug!(voter = %voter, "vote updated");
        Ok(())
    }

    fn add_proxied(&mut self, proxy: Name, delta: i64) -> Result<()> {
        self.voters.entry(proxy).or_default().proxied_vote_weight += delta;
        self.propagate(proxy)
    }

    /// Applies the voter's current weight to their producers or proxy.
    fn propagate(&mut self, voter: Name) -> Result<()> {
        let Some(row) = self.voters.get_mut(&voter) else {
            return Ok(());
        };
        let weight = row.weight();
        let delta = weight - row.last_vote_weight;
        if delta == 0 {
            return Ok(());
        }
        row.last_vote_weight = weight;
        let proxy = row.proxy;
        let producers = row.producers.clone();
        if let Some(proxy) = proxy {
            self.add_proxied(proxy, delta)?;
        } else {
            for p in producers {
                *self.producer_votes.entry(p).or_insert(0) += delta;
            }
        }
        Ok(())
    }

    /// Voting record of `voter`.
    #[must_use]
    pub fn voter(&self, voter: Name) -> Option<&Voter> {
        self.voters.get(&voter)
    }

    /// Total weight voted for `producer`.
    #[must_use]
    pub fn producer_votes(&self, producer: Name) -> i64 {
        self.producer_votes.get(&producer).copied().unwrap_or(0)
    }

    /// Resources granted to `account`.
    #[must_use]
    pub fn resources(&self, account: Name) -> UserResources {
        self.resources.get(&account).copied().unwrap_or_default()
    }

    /// Stake delegated from `from` to `receiver`.
    #[must_use]
    pub fn delegation(&self, from: Name, receiver: Name) -> Delegation {
        self.delegations
            .get(&from)
            .and_then(|d| d.get(&receiver))
            .copied()
            .unwrap_or_default()
    }

    /// Every non-zero balance of `symbol`.
    pub fn holders(&self, symbol: Symbol) -> impl Iterator<Item = (Name, i64)> + '_ {
        self.balances
            .get(&symbol)
            .into_iter()
            .flat_map(|m| m.iter().map(|(n, a)| (*n, *a)))
            .filter(|(_, a)| *a != 0)
    }
}

impl TokenLedger for InMemoryHost {
    fn core_symbol(&self) -> Option<Symbol> {
        self.supply.contains_key(&self.core).then_some(self.core)
    }

    fn supply_of(&self, symbol: Symbol) -> Asset {
        Asset::new(self.supply.get(&symbol).copied().unwrap_or(0), symbol)
    }

    fn balance_of(&self, owner: Name, symbol: Symbol) -> Asset {
        let amount = self
            .balances
            .get(&symbol)
            .and_then(|m| m.get(&owner))
            .copied()
            .unwrap_or(0);
        Asset::new(amount, symbol)
    }

    fn transfer(&mut self, from: Name, to: Name, quantity: Asset, memo: &str) -> Result<()> {
        if from == to {
            return Err(RexError::Transfer("cannot transfer to self".into()));
        }
        if quantity.amount <= 0 || !quantity.is_valid() {
            return Err(RexError::Transfer("must transfer positive quantity".into()));
        }
        let ledger = self.balances.entry(quantity.symbol).or_default();
        let available = ledger.get(&from).copied().unwrap_or(0);
        if available < quantity.amount {
            return Err(RexError::Transfer(format!(
                "overdrawn balance: {from} has {} but needs {quantity}",
                Asset::new(available, quantity.symbol)
            )));
        }
        ledger.insert(from, available - quantity.amount);
        *ledger.entry(to).or_insert(0) += quantity.amount;
        debug!(from = %from, to = %to, quantity = %quantity, memo, "transfer completed");
        Ok(())
    }
}

impl ResourceLedger for InMemoryHost {
    fn add_rented(&mut self, receiver: Name, resource: Resource, delta: i64) -> Result<()> {
        let res = self.resources.entry(receiver).or_default();
        let slot = match resource {
            Resource::Cpu => &mut res.rented_cpu,
            Resource::Net => &mut res.rented_net,
        };
        if *slot + delta < 0 {
            return Err(RexError::invariant(format!(
                "rented {resource} of {receiver} would turn negative"
            )));
        }
        *slot += delta;
        Ok(())
    }

    fn ram_bytes(&self, account: Name) -> i64 {
        self.resources.get(&account).map_or(0, |r| r.ram_bytes)
    }

    fn add_ram_bytes(&mut self, account: Name, delta: i64) -> Result<()> {
        let res = self.resources.entry(account).or_default();
        if res.ram_bytes + delta < 0 {
            return Err(RexError::insufficient("insufficient quota"));
        }
        res.ram_bytes += delta;
        Ok(())
    }

    fn undelegate(&mut self, from: Name, receiver: Name, net: Asset, cpu: Asset) -> Result<()> {
        let del = self
            .delegations
            .get_mut(&from)
            .and_then(|d| d.get_mut(&receiver))
            .ok_or_else(|| RexError::not_found("you are not delegating to receiver"))?;
        if net.amount > del.net_weight || cpu.amount > del.cpu_weight {
            return Err(RexError::insufficient(
                "amount exceeds tokens staked for net or cpu",
            ));
        }
        del.net_weight -= net.amount;
        del.cpu_weight -= cpu.amount;
        if del.net_weight == 0 && del.cpu_weight == 0 {
            if let Some(map) = self.delegations.get_mut(&from) {
                map.remove(&receiver);
            }
        }
        let res = self.resources.entry(receiver).or_default();
        res.net_weight -= net.amount;
        res.cpu_weight -= cpu.amount;
        Ok(())
    }
}

impl VoteRegistry for InMemoryHost {
    fn meets_rex_requirement(&self, owner: Name, min_producers: usize) -> bool {
        self.voters
            .get(&owner)
            .is_some_and(|v| v.proxy.is_some() || v.producers.len() >= min_producers)
    }

    fn update_voting_power(&mut self, voter: Name, delta: i64) -> Result<()> {
        let row = self.voters.entry(voter).or_default();
        if row.staked + delta < 0 {
            return Err(RexError::invariant(format!(
                "stake for voting of {voter} cannot be negative"
            )));
        }
        row.staked += delta;
        self.propagate(voter)
    }
}
