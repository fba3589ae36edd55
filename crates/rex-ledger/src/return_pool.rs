//! Return pool smoothing.
//!
//! Proceeds from rentals, RAM fees, name bids and donations do not enter the
//! lending pool at once. They collect in a pending bucket for the current
//! window; once the window closes the bucket becomes live and releases its
//! amount linearly, one distribution interval at a time, over the return
//! horizon.

use rex_core::TimePointSec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bancor::mul_div;
use crate::config::RexConfig;
use crate::error::{RexError, Result};

/// Current record version of [`ReturnPool`].
pub const RETURN_POOL_VERSION: u8 = 0;

/// Release schedule state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPool {
    /// Record version.
    pub version: u8,
    /// Last distribution boundary processed.
    pub last_dist_time: TimePointSec,
    /// Window end of the pending bucket, [`TimePointSec::MAX`] when empty.
    pub pending_bucket_time: TimePointSec,
    /// Time of the oldest live bucket, [`TimePointSec::MIN`] when none.
    pub oldest_bucket_time: TimePointSec,
    /// Proceeds collected in the pending bucket.
    pub pending_bucket_proceeds: i64,
    /// Summed per-interval release of all live buckets.
    pub current_rate_of_increase: i64,
    /// Proceeds not yet released, pending bucket included.
    pub proceeds: i64,
}

/// One live bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBucket {
    /// Start of the release schedule.
    pub time: TimePointSec,
    /// Amount not yet released.
    pub amount: i64,
}

/// Live buckets, ascending by time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBuckets {
    /// Record version.
    pub version: u8,
    /// Buckets in ascending time order.
    pub buckets: Vec<ReturnBucket>,
}

impl ReturnBuckets {
    /// Sum of unreleased amounts.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.buckets.iter().map(|b| b.amount).sum()
    }

    fn insert(&mut self, bucket: ReturnBucket) {
        let pos = self.buckets.partition_point(|b| b.time <= bucket.time);
        if pos > 0 && self.buckets[pos - 1].time == bucket.time {
            self.buckets[pos - 1].amount += bucket.amount;
        } else {
            self.buckets.insert(pos, bucket);
        }
    }
}

impl ReturnPool {
    /// Empty schedule whose distribution clock starts at `now`.
    #[must_use]
    pub const fn new(now: TimePointSec, config: &RexConfig) -> Self {
        Self {
            version: RETURN_POOL_VERSION,
            last_dist_time: now.floor_to(config.dist_interval_secs),
            pending_bucket_time: TimePointSec::MAX,
            oldest_bucket_time: TimePointSec::MIN,
            pending_bucket_proceeds: 0,
            current_rate_of_increase: 0,
            proceeds: 0,
        }
    }

    /// Adds proceeds to the pending bucket of the window containing `now`.
    ///
    /// A pending bucket from an earlier window is made live first.
    ///
    /// # Errors
    ///
    /// Returns error for a non-positive amount or on overflow.
    pub fn add(
        &mut self,
        now: TimePointSec,
        amount: i64,
        buckets: &mut ReturnBuckets,
        config: &RexConfig,
    ) -> Result<()> {
        if amount <= 0 {
            return Err(RexError::invalid_quantity(
                "return pool proceeds must be positive",
            ));
        }
        let window = config.bucket_interval_secs();
        let bucket_time = now.floor_to(window).plus_secs(window);

        if self.pending_bucket_time != TimePointSec::MAX && self.pending_bucket_time < bucket_time
        {
            self.activate_pending(buckets);
        }
        self.pending_bucket_time = bucket_time;
        self.pending_bucket_proceeds = self
            .pending_bucket_proceeds
            .checked_add(amount)
            .ok_or_else(|| RexError::invariant("pending bucket overflow"))?;
        self.proceeds = self
            .proceeds
            .checked_add(amount)
            .ok_or_else(|| RexError::invariant("return pool overflow"))?;
        Ok(())
    }

    fn activate_pending(&mut self, buckets: &mut ReturnBuckets) {
        if self.pending_bucket_proceeds > 0 {
            debug!(
                time = %self.pending_bucket_time,
                amount = self.pending_bucket_proceeds,
                "return bucket activated"
            );
            buckets.insert(ReturnBucket {
                time: self.pending_bucket_time,
                amount: self.pending_bucket_proceeds,
            });
        }
        self.pending_bucket_time = TimePointSec::MAX;
        self.pending_bucket_proceeds = 0;
    }

    /// Releases everything due up to `now` and returns the released amount.
    ///
    /// Idempotent within one distribution interval.
    ///
    /// # Errors
    ///
    /// Returns error if the release arithmetic overflows.
    pub fn distribute(
        &mut self,
        now: TimePointSec,
        buckets: &mut ReturnBuckets,
        config: &RexConfig,
    ) -> Result<i64> {
        let interval = config.dist_interval_secs;
        let horizon = config.horizon_secs();
        let effective = now.floor_to(interval);
        if effective <= self.last_dist_time {
            return Ok(0);
        }

        if self.pending_bucket_time != TimePointSec::MAX && self.pending_bucket_time <= effective {
            self.activate_pending(buckets);
        }

        let mut released = 0i64;
        for bucket in &mut buckets.buckets {
            let start = bucket.time.max(self.last_dist_time);
            let end = bucket.time.plus_secs(horizon);
            if effective <= start || bucket.amount == 0 {
                continue;
            }
            let left = end.secs_since(start) / interval;
            let elapsed = effective.min(end).secs_since(start) / interval;
            let release = if elapsed >= left {
                bucket.amount
            } else {
                mul_div(bucket.amount, i64::from(elapsed), i64::from(left))?
            };
            bucket.amount -= release;
            released += release;
        }
        buckets.buckets.retain(|b| b.amount > 0);

        self.proceeds -= released;
        self.last_dist_time = effective;
        self.refresh(buckets, config);
        Ok(released)
    }

    fn refresh(&mut self, buckets: &ReturnBuckets, config: &RexConfig) {
        let interval = config.dist_interval_secs;
        let horizon = config.horizon_secs();
        let mut rate = 0i64;
        for bucket in &buckets.buckets {
            let start = bucket.time.max(self.last_dist_time);
            let left = bucket.time.plus_secs(horizon).secs_since(start) / interval;
            if left > 0 {
                rate += bucket.amount / i64::from(left);
            }
        }
        self.current_rate_of_increase = rate;
        self.oldest_bucket_time = buckets
            .buckets
            .first()
            .map_or(TimePointSec::MIN, |b| b.time);
    }

    /// Checks `proceeds == pending + Σ buckets`.
    ///
    /// # Errors
    ///
    /// Returns [`RexError::Invariant`] when the totals disagree.
    pub fn check(&self, buckets: &ReturnBuckets) -> Result<()> {
        let total = self.pending_bucket_proceeds + buckets.total();
        if self.proceeds != total || self.proceeds < 0 {
            return Err(RexError::invariant(format!(
                "return pool proceeds {} != pending {} + buckets {}",
                self.proceeds,
                self.pending_bucket_proceeds,
                buckets.total()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rex_core::SECONDS_PER_DAY;

    const T0: u32 = 1_700_000_000 - 1_700_000_000 % SECONDS_PER_DAY;

    fn setup() -> (ReturnPool, ReturnBuckets, RexConfig) {
        let config = RexConfig::default();
        let pool = ReturnPool::new(TimePointSec::from_secs(T0), &config);
        (pool, ReturnBuckets::default(), config)
    }

    #[test]
    fn add_goes_to_pending_window() {
        let (mut pool, mut buckets, config) = setup();
        pool.add(TimePointSec::from_secs(T0 + 100), 1_000, &mut buckets, &config)
            .unwrap();
        assert_eq!(pool.pending_bucket_time.secs(), T0 + 12 * 3_600);
        assert_eq!(pool.pending_bucket_proceeds, 1_000);
        assert_eq!(pool.proceeds, 1_000);
        assert!(buckets.buckets.is_empty());
        pool.check(&buckets).unwrap();
    }

    #[test]
    fn nothing_released_before_window_closes() {
        let (mut pool, mut buckets, config) = setup();
        pool.add(TimePointSec::from_secs(T0), 1_000, &mut buckets, &config)
            .unwrap();
        let released = pool
            .distribute(TimePointSec::from_secs(T0 + 3_600), &mut buckets, &config)
            .unwrap();
        assert_eq!(released, 0);
        assert_eq!(pool.proceeds, 1_000);
    }

    #[test]
    fn releases_linearly_then_fully() {
        let (mut pool, mut buckets, config) = setup();
        let amount = 4_320_000;
        pool.add(TimePointSec::from_secs(T0), amount, &mut buckets, &config)
            .unwrap();
        let start = T0 + 12 * 3_600;

        // One day after activation: 144 of 4320 intervals.
        let released = pool
            .distribute(
                TimePointSec::from_secs(start + SECONDS_PER_DAY),
                &mut buckets,
                &config,
            )
            .unwrap();
        assert_eq!(released, amount / 30);
        pool.check(&buckets).unwrap();
        assert_eq!(pool.oldest_bucket_time.secs(), start);
        assert!(pool.current_rate_of_increase > 0);

        let rest = pool
            .distribute(
                TimePointSec::from_secs(start + 40 * SECONDS_PER_DAY),
                &mut buckets,
                &config,
            )
            .unwrap();
        assert_eq!(released + rest, amount);
        assert_eq!(pool.proceeds, 0);
        assert!(buckets.buckets.is_empty());
        assert_eq!(pool.oldest_bucket_time, TimePointSec::MIN);
        pool.check(&buckets).unwrap();
    }

    #[test]
    fn distribute_is_idempotent_within_interval() {
        let (mut pool, mut buckets, config) = setup();
        pool.add(TimePointSec::from_secs(T0), 100_000, &mut buckets, &config)
            .unwrap();
        let t = TimePointSec::from_secs(T0 + 2 * SECONDS_PER_DAY);
        let first = pool.distribute(t, &mut buckets, &config).unwrap();
        let second = pool
            .distribute(t.plus_secs(30), &mut buckets, &config)
            .unwrap();
        assert!(first > 0);
        assert_eq!(second, 0);
    }

    #[test]
    fn later_window_activates_previous_pending() {
        let (mut pool, mut buckets, config) = setup();
        pool.add(TimePointSec::from_secs(T0), 500, &mut buckets, &config)
            .unwrap();
        pool.add(
            TimePointSec::from_secs(T0 + 13 * 3_600),
            700,
            &mut buckets,
            &config,
        )
        .unwrap();
        assert_eq!(buckets.buckets.len(), 1);
        assert_eq!(buckets.buckets[0].amount, 500);
        assert_eq!(pool.pending_bucket_proceeds, 700);
        assert_eq!(pool.proceeds, 1_200);
        pool.check(&buckets).unwrap();
    }

    #[test]
    fn rejects_non_positive() {
        let (mut pool, mut buckets, config) = setup();
        assert!(pool
            .add(TimePointSec::from_secs(T0), 0, &mut buckets, &config)
            .is_err());
    }
}
