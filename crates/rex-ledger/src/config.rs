//! Ledger configuration.
//!
//! Economic constants of the exchange, loadable from TOML. Every field has a
//! default, so an empty file yields the standard parameters.

use std::path::Path;

use rex_core::{SECONDS_PER_DAY, SECONDS_PER_HOUR};
use serde::{Deserialize, Serialize};

use crate::error::{RexError, Result};

/// Economic and batching parameters of the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RexConfig {
    /// Length of one rental period in days.
    pub loan_duration_days: u32,
    /// Interval between return-pool distributions in seconds.
    pub dist_interval_secs: u32,
    /// Days over which each return bucket is released.
    pub return_horizon_days: u32,
    /// Width of a return bucket window in hours.
    pub hours_per_bucket: u32,
    /// REX shares minted per core unit when the pool is empty.
    pub rex_ratio: i64,
    /// Virtual rent balance the pool starts with, in core units.
    pub init_total_rent: i64,
    /// Share of `total_lent` held back from sales, in percent. Zero lets a
    /// sale fill whenever unlent liquidity covers it.
    pub unlent_lower_bound_pct: u8,
    /// RAM trading fee in basis points.
    pub ram_fee_bps: u32,
    /// Default number of days until purchased REX matures.
    pub default_maturity_buckets: u32,
    /// Upper bound accepted by `setrexmature`.
    pub max_maturity_buckets: u32,
    /// Batch size of the drain run implicitly by user actions.
    pub auto_exec_batch: u16,
    /// Require buyers to vote for producers or a proxy.
    pub require_voting: bool,
    /// Minimum producers voted for to satisfy the voting requirement.
    pub min_producer_votes: usize,
    /// Total RAM in bytes at initialization.
    pub max_ram_size: u64,
    /// Quote connector = core supply / this divisor at initialization.
    pub ram_quote_divisor: i64,
}

impl Default for RexConfig {
    fn default() -> Self {
        Self {
            loan_duration_days: 30,
            dist_interval_secs: 10 * 60,
            return_horizon_days: 30,
            hours_per_bucket: 12,
            rex_ratio: 10_000,
            init_total_rent: 20_000_0000,
            unlent_lower_bound_pct: 0,
            ram_fee_bps: 50,
            default_maturity_buckets: 5,
            max_maturity_buckets: 30,
            auto_exec_batch: 2,
            require_voting: true,
            min_producer_votes: 21,
            max_ram_size: 64 * 1024 * 1024 * 1024,
            ram_quote_divisor: 1_000,
        }
    }
}

impl RexConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RexError::Config(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RexError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.loan_duration_days == 0 {
            return Err(RexError::Config("loan_duration_days must be greater than 0".into()));
        }
        if self.dist_interval_secs == 0 {
            return Err(RexError::Config("dist_interval_secs must be greater than 0".into()));
        }
        if self.hours_per_bucket == 0 || self.return_horizon_days == 0 {
            return Err(RexError::Config(
                "hours_per_bucket and return_horizon_days must be greater than 0".into(),
            ));
        }
        if self.bucket_interval_secs() % self.dist_interval_secs != 0 {
            return Err(RexError::Config(
                "bucket window must be a multiple of dist_interval_secs".into(),
            ));
        }
        if self.horizon_secs() % self.bucket_interval_secs() != 0 {
            return Err(RexError::Config(
                "return horizon must be a multiple of the bucket window".into(),
            ));
        }
        if self.rex_ratio <= 0 || self.init_total_rent <= 0 {
            return Err(RexError::Config(
                "rex_ratio and init_total_rent must be positive".into(),
            ));
        }
        if self.unlent_lower_bound_pct > 100 {
            return Err(RexError::Config("unlent_lower_bound_pct must be <= 100".into()));
        }
        if self.ram_fee_bps >= 10_000 {
            return Err(RexError::Config("ram_fee_bps must be below 10000".into()));
        }
        if self.default_maturity_buckets == 0
            || self.default_maturity_buckets > self.max_maturity_buckets
        {
            return Err(RexError::Config(
                "default_maturity_buckets must be in 1..=max_maturity_buckets".into(),
            ));
        }
        if self.ram_quote_divisor <= 0 {
            return Err(RexError::Config("ram_quote_divisor must be positive".into()));
        }
        Ok(())
    }

    /// Rental period in seconds.
    #[must_use]
    pub const fn loan_duration_secs(&self) -> u32 {
        self.loan_duration_days * SECONDS_PER_DAY
    }

    /// Return bucket window in seconds.
    #[must_use]
    pub const fn bucket_interval_secs(&self) -> u32 {
        self.hours_per_bucket * SECONDS_PER_HOUR
    }

    /// Return horizon in seconds.
    #[must_use]
    pub const fn horizon_secs(&self) -> u32 {
        self.return_horizon_days * SECONDS_PER_DAY
    }

    /// Number of distribution intervals in the return horizon.
    #[must_use]
    pub const fn total_intervals(&self) -> u32 {
        self.horizon_secs() / self.dist_interval_secs
    }
}
