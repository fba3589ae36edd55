//! Queue of sell orders waiting for liquidity.
//!
//! Each owner has at most one row. Open rows are ordered by placement time;
//! closed rows sort after every open row and wait for the owner's next
//! touch to be settled.

use std::collections::{BTreeMap, BTreeSet};

use rex_core::{Asset, Name, Symbol, TimePointSec, REX_SYMBOL};
use serde::{Deserialize, Serialize};

use crate::error::{RexError, Result};

/// A queued or filled sell order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RexOrder {
    /// Record version.
    pub version: u8,
    /// Selling account.
    pub owner: Name,
    /// Shares to sell.
    pub rex_requested: Asset,
    /// Core tokens owed once filled.
    pub proceeds: Asset,
    /// Vote-stake adjustment owed once filled.
    pub stake_change: Asset,
    /// When the order was placed.
    pub order_time: TimePointSec,
    /// False once filled.
    pub is_open: bool,
}

impl RexOrder {
    /// Sort key of the time index.
    const fn time_key(&self) -> (bool, TimePointSec, Name) {
        (!self.is_open, self.order_time, self.owner)
    }
}

/// Orders keyed by owner with a FIFO time index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RexOrder>", into = "Vec<RexOrder>")]
pub struct OrderQueue {
    rows: BTreeMap<Name, RexOrder>,
    by_time: BTreeSet<(bool, TimePointSec, Name)>,
}

impl OrderQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The owner's order, open or closed.
    #[must_use]
    pub fn get(&self, owner: Name) -> Option<&RexOrder> {
        self.rows.get(&owner)
    }

    /// Places a new open order.
    ///
    /// # Errors
    ///
    /// Returns error if the owner already has an order row.
    pub fn open(
        &mut self,
        owner: Name,
        rex: i64,
        core: Symbol,
        now: TimePointSec,
    ) -> Result<&RexOrder> {
        if self.rows.contains_key(&owner) {
            return Err(RexError::invariant(format!("{owner} already has an order")));
        }
        let order = RexOrder {
            version: 0,
            owner,
            rex_requested: Asset::new(rex, REX_SYMBOL),
            proceeds: Asset::zero(core),
            stake_change: Asset::zero(core),
            order_time: now,
            is_open: true,
        };
        self.by_time.insert(order.time_key());
        Ok(self.rows.entry(owner).or_insert(order))
    }

    /// Adds `rex` to an open order without changing its queue position.
    ///
    /// # Errors
    ///
    /// Returns error if the owner has no open order.
    pub fn add_to_open(&mut self, owner: Name, rex: i64) -> Result<&RexOrder> {
        let order = self
            .rows
            .get_mut(&owner)
            .filter(|o| o.is_open)
            .ok_or_else(|| RexError::not_found("no open sellrex order"))?;
        order.rex_requested.amount += rex;
        Ok(order)
    }

    /// Marks an open order filled.
    ///
    /// # Errors
    ///
    /// Returns error if the owner has no open order.
    pub fn close(&mut self, owner: Name, proceeds: i64, stake_change: i64) -> Result<()> {
        let order = self
            .rows
            .get_mut(&owner)
            .filter(|o| o.is_open)
            .ok_or_else(|| RexError::not_found("no open sellrex order"))?;
        self.by_time.remove(&order.time_key());
        order.proceeds.amount = proceeds;
        order.stake_change.amount = stake_change;
        order.is_open = false;
        self.by_time.insert(order.time_key());
        Ok(())
    }

    /// Removes and returns the owner's row.
    pub fn remove(&mut self, owner: Name) -> Option<RexOrder> {
        let order = self.rows.remove(&owner)?;
        self.by_time.remove(&order.time_key());
        Some(order)
    }

    /// Owner of the oldest open order.
    #[must_use]
    pub fn oldest_open(&self) -> Option<Name> {
        self.by_time
            .first()
            .filter(|(closed, _, _)| !closed)
            .map(|(_, _, owner)| *owner)
    }

    /// Open orders in fill order.
    pub fn iter_open(&self) -> impl Iterator<Item = &RexOrder> {
        self.by_time
            .iter()
            .take_while(|(closed, _, _)| !closed)
            .filter_map(|(_, _, owner)| self.rows.get(owner))
    }

    /// All rows in owner order.
    pub fn iter(&self) -> impl Iterator<Item = &RexOrder> {
        self.rows.values()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TryFrom<Vec<RexOrder>> for OrderQueue {
    type Error = RexError;

    fn try_from(rows: Vec<RexOrder>) -> Result<Self> {
        let mut queue = Self::new();
        for order in rows {
            if queue.rows.contains_key(&order.owner) {
                return Err(RexError::Snapshot(format!(
                    "duplicate order for {}",
                    order.owner
                )));
            }
            queue.by_time.insert(order.time_key());
            queue.rows.insert(order.owner, order);
        }
        Ok(queue)
    }
}

impl From<OrderQueue> for Vec<RexOrder> {
    fn from(queue: OrderQueue) -> Self {
        queue.rows.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EOS: Symbol = Symbol::new_unchecked(4, "EOS");

    fn name(s: &str) -> Name {
        Name::new_unchecked(s)
    }

    #[test]
    fn test_fifo_by_time() {
        let mut q = OrderQueue::new();
        q.open(name("bob"), 10, EOS, TimePointSec::from_secs(20)).unwrap();
        q.open(name("alice"), 10, EOS, TimePointSec::from_secs(30)).unwrap();
        q.open(name("carol"), 10, EOS, TimePointSec::from_secs(10)).unwrap();
        let order: Vec<_> = q.iter_open().map(|o| o.owner).collect();
        assert_eq!(order, vec![name("carol"), name("bob"), name("alice")]);
        assert_eq!(q.oldest_open(), Some(name("carol")));
    }

    #[test]
    fn test_closed_sort_last() {
        let mut q = OrderQueue::new();
        q.open(name("bob"), 10, EOS, TimePointSec::from_secs(10)).unwrap();
        q.open(name("alice"), 10, EOS, TimePointSec::from_secs(20)).unwrap();
        q.close(name("bob"), 5, -1).unwrap();
        assert_eq!(q.oldest_open(), Some(name("alice")));
        assert_eq!(q.iter_open().count(), 1);
        let bob = q.get(name("bob")).unwrap();
        assert!(!bob.is_open);
        assert_eq!(bob.proceeds.amount, 5);
        q.close(name("alice"), 1, 0).unwrap();
        assert_eq!(q.oldest_open(), None);
    }

    #[test]
    fn test_add_to_open_keeps_position() {
        let mut q = OrderQueue::new();
        q.open(name("bob"), 10, EOS, TimePointSec::from_secs(10)).unwrap();
        q.open(name("alice"), 10, EOS, TimePointSec::from_secs(20)).unwrap();
        let total = q.add_to_open(name("bob"), 5).unwrap().rex_requested.amount;
        assert_eq!(total, 15);
        assert_eq!(q.oldest_open(), Some(name("bob")));
    }

    #[test]
    fn test_single_row_per_owner() {
        let mut q = OrderQueue::new();
        q.open(name("bob"), 10, EOS, TimePointSec::from_secs(10)).unwrap();
        assert!(q.open(name("bob"), 1, EOS, TimePointSec::from_secs(11)).is_err());
        q.close(name("bob"), 1, 0).unwrap();
        assert!(q.add_to_open(name("bob"), 1).is_err());
        assert!(q.remove(name("bob")).is_some());
        assert!(q.is_empty());
    }
}
