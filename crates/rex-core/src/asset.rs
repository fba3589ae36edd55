//! Token symbols and quantities.
//!
//! An [`Asset`] is a signed integer amount of indivisible units tagged with a
//! [`Symbol`]; the symbol's precision says where the decimal point goes when
//! the quantity is displayed. `1.0000 EOS` is `10_000` units of `4,EOS`.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

/// Largest representable asset magnitude (`2^62 - 1`).
pub const MAX_ASSET_AMOUNT: i64 = (1 << 62) - 1;

/// Maximum decimal precision of a symbol.
pub const MAX_PRECISION: u8 = 18;

const MAX_CODE_LEN: usize = 7;

/// A token symbol: decimal precision plus an uppercase code of 1 to 7 letters.
///
/// Packed into a `u64`: the low byte holds the precision, the following bytes
/// the code characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Symbol(u64);

impl Symbol {
    /// Builds a symbol from literals known to be valid.
    #[must_use]
    pub const fn new_unchecked(precision: u8, code: &str) -> Self {
        let bytes = code.as_bytes();
        let mut value = precision as u64;
        let mut i = 0;
        while i < bytes.len() && i < MAX_CODE_LEN {
            value |= (bytes[i] as u64) << (8 * (i + 1));
            i += 1;
        }
        Self(value)
    }

    /// Builds and validates a symbol.
    ///
    /// # Errors
    ///
    /// Returns error if the code is not 1-7 uppercase letters or the
    /// precision exceeds 18.
    pub fn new(precision: u8, code: &str) -> Result<Self> {
        if precision > MAX_PRECISION {
            return Err(CoreError::InvalidSymbol(format!(
                "precision {precision} exceeds {MAX_PRECISION}"
            )));
        }
        if code.is_empty() || code.len() > MAX_CODE_LEN {
            return Err(CoreError::InvalidSymbol(format!(
                "code '{code}' must be 1 to {MAX_CODE_LEN} characters"
            )));
        }
        if !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(CoreError::InvalidSymbol(format!(
                "code '{code}' must be uppercase A-Z"
            )));
        }
        Ok(Self::new_unchecked(precision, code))
    }

    /// Returns the decimal precision.
    #[must_use]
    pub const fn precision(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Returns the symbol code.
    #[must_use]
    pub fn code(self) -> String {
        let mut code = String::with_capacity(MAX_CODE_LEN);
        let mut rest = self.0 >> 8;
        while rest != 0 {
            code.push(char::from((rest & 0xff) as u8));
            rest >>= 8;
        }
        code
    }

    /// Returns the packed value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns true if the symbol holds a valid code and precision.
    #[must_use]
    pub fn is_valid(self) -> bool {
        Self::new(self.precision(), &self.code()).is_ok()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision(), self.code())
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| CoreError::InvalidSymbol(format!("expected '<precision>,<code>': {s}")))?;
        let precision: u8 = precision
            .trim()
            .parse()
            .map_err(|_| CoreError::InvalidSymbol(format!("invalid precision: {s}")))?;
        Self::new(precision, code.trim())
    }
}

impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A token quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Asset {
    /// Amount in indivisible units.
    pub amount: i64,
    /// Symbol the amount is denominated in.
    pub symbol: Symbol,
}

impl Asset {
    /// Creates an asset.
    #[must_use]
    pub const fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    /// Zero units of `symbol`.
    #[must_use]
    pub const fn zero(symbol: Symbol) -> Self {
        Self { amount: 0, symbol }
    }

    /// Returns true if the amount is in range and the symbol is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-MAX_ASSET_AMOUNT..=MAX_ASSET_AMOUNT).contains(&self.amount) && self.symbol.is_valid()
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.amount > 0
    }

    fn same_symbol(&self, other: &Self) -> Result<()> {
        if self.symbol == other.symbol {
            Ok(())
        } else {
            Err(CoreError::SymbolMismatch {
                left: self.symbol.to_string(),
                right: other.symbol.to_string(),
            })
        }
    }

    fn in_range(amount: i64, symbol: Symbol) -> Result<Self> {
        if (-MAX_ASSET_AMOUNT..=MAX_ASSET_AMOUNT).contains(&amount) {
            Ok(Self { amount, symbol })
        } else {
            Err(CoreError::InvalidAsset("amount out of range".into()))
        }
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns error on symbol mismatch or when the result leaves the
    /// representable range.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.same_symbol(&rhs)?;
        let amount = self
            .amount
            .checked_add(rhs.amount)
            .ok_or_else(|| CoreError::InvalidAsset("addition overflow".into()))?;
        Self::in_range(amount, self.symbol)
    }

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns error on symbol mismatch or when the result leaves the
    /// representable range.
    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.same_symbol(&rhs)?;
        let amount = self
            .amount
            .checked_sub(rhs.amount)
            .ok_or_else(|| CoreError::InvalidAsset("subtraction underflow".into()))?;
        Self::in_range(amount, self.symbol)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = u32::from(self.symbol.precision());
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        if precision == 0 {
            return write!(f, "{sign}{magnitude} {}", self.symbol.code());
        }
        let scale = 10u64.pow(precision);
        let whole = magnitude / scale;
        let frac = magnitude % scale;
        write!(
            f,
            "{sign}{whole}.{frac:0width$} {}",
            self.symbol.code(),
            width = precision as usize
        )
    }
}

impl FromStr for Asset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (number, code) = s
            .split_once(' ')
            .ok_or_else(|| CoreError::InvalidAsset(format!("expected '<amount> <CODE>': {s}")))?;
        let (negative, number) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidAsset(format!("invalid whole part: {s}")));
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidAsset(format!("invalid fractional part: {s}")));
        }
        let precision = u8::try_from(frac.len())
            .map_err(|_| CoreError::InvalidAsset("too many decimal places".into()))?;
        let symbol = Symbol::new(precision, code.trim())?;

        let digits = format!("{whole}{frac}");
        let magnitude: i64 = digits
            .parse()
            .map_err(|_| CoreError::InvalidAsset(format!("amount overflow: {s}")))?;
        let amount = if negative { -magnitude } else { magnitude };
        Self::in_range(amount, symbol)
    }
}

impl Serialize for Asset {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
