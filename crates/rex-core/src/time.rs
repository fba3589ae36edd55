//! Second-resolution time points.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Seconds in an hour.
pub const SECONDS_PER_HOUR: u32 = 3_600;

/// Seconds in a day.
pub const SECONDS_PER_DAY: u32 = 24 * SECONDS_PER_HOUR;

/// Seconds since the Unix epoch, in UTC.
///
/// [`TimePointSec::MAX`] doubles as a "never" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimePointSec(u32);

impl TimePointSec {
    /// The epoch.
    pub const MIN: Self = Self(0);

    /// The latest representable time, used as a "never" sentinel.
    pub const MAX: Self = Self(u32::MAX);

    /// Creates a time point from seconds since the epoch.
    #[must_use]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Returns seconds since the epoch.
    #[must_use]
    pub const fn secs(self) -> u32 {
        self.0
    }

    /// Adds seconds, saturating at [`TimePointSec::MAX`].
    #[must_use]
    pub const fn plus_secs(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Subtracts seconds, saturating at the epoch.
    #[must_use]
    pub const fn minus_secs(self, secs: u32) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Adds whole days, saturating.
    #[must_use]
    pub const fn plus_days(self, days: u32) -> Self {
        self.plus_secs(days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Rounds down to a multiple of `interval` seconds.
    #[must_use]
    pub const fn floor_to(self, interval: u32) -> Self {
        if interval == 0 {
            return self;
        }
        Self(self.0 - self.0 % interval)
    }

    /// Midnight UTC of the current day.
    #[must_use]
    pub const fn start_of_day(self) -> Self {
        self.floor_to(SECONDS_PER_DAY)
    }

    /// Midnight UTC that ends the current day.
    #[must_use]
    pub const fn end_of_day(self) -> Self {
        self.start_of_day().plus_secs(SECONDS_PER_DAY)
    }

    /// Whole seconds from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub const fn secs_since(self, earlier: Self) -> u32 {
        self.0.saturating_sub(earlier.0)
    }

    /// Converts a `chrono` timestamp.
    ///
    /// # Errors
    ///
    /// Returns error for timestamps before 1970 or after 2106.
    pub fn from_datetime(dt: DateTime<Utc>) -> Result<Self> {
        u32::try_from(dt.timestamp())
            .map(Self)
            .map_err(|_| CoreError::InvalidTime(format!("{dt} is outside the u32 second range")))
    }

    /// Current wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns error if the system clock is outside the representable range.
    pub fn now() -> Result<Self> {
        Self::from_datetime(Utc::now())
    }

    /// Converts to a `chrono` timestamp.
    #[must_use]
    pub fn to_datetime(self) -> DateTime<Utc> {
        Utc.timestamp_opt(i64::from(self.0), 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAX {
            return f.write_str("never");
        }
        write!(f, "{}", self.to_datetime().format("%Y-%m-%dT%H:%M:%S"))
    }
}
