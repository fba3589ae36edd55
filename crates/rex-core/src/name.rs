//! Account names.
//!
//! Names are up to 12 characters from `.12345abcdefghijklmnopqrstuvwxyz`,
//! packed 5 bits per character into a `u64`. Ordering follows the packed
//! value, which matches lexicographic order of the textual form.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

/// Maximum number of characters in a name.
pub const MAX_NAME_LEN: usize = 12;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// A packed account name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Name(u64);

const fn char_to_value(c: u8) -> Option<u64> {
    match c {
        b'.' => Some(0),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        _ => None,
    }
}

impl Name {
    /// Packs a name known to be valid at compile time.
    ///
    /// Characters outside the alphabet are packed as `.`; use
    /// [`Name::from_str`] for untrusted input.
    #[must_use]
    pub const fn new_unchecked(s: &str) -> Self {
        let bytes = s.as_bytes();
        let mut value: u64 = 0;
        let mut i = 0;
        while i < bytes.len() && i < MAX_NAME_LEN {
            let v = match char_to_value(bytes[i]) {
                Some(v) => v,
                None => 0,
            };
            value |= (v & 0x1f) << (64 - 5 * (i + 1));
            i += 1;
        }
        Self(value)
    }

    /// Creates a name from its raw packed value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the packed value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns true for the empty name.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromStr for Name {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s.len() > MAX_NAME_LEN {
            return Err(CoreError::InvalidName(format!(
                "'{s}' must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        if s.ends_with('.') {
            return Err(CoreError::InvalidName(format!("'{s}' must not end with '.'")));
        }
        if let Some(bad) = s.bytes().find(|b| char_to_value(*b).is_none()) {
            return Err(CoreError::InvalidName(format!(
                "'{s}' contains invalid character '{}'",
                bad as char
            )));
        }
        Ok(Self::new_unchecked(s))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; MAX_NAME_LEN];
        for (i, slot) in out.iter_mut().enumerate() {
            let v = (self.0 >> (64 - 5 * (i + 1))) & 0x1f;
            *slot = CHARMAP[v as usize];
        }
        let len = out.iter().rposition(|c| *c != b'.').map_or(0, |p| p + 1);
        // CHARMAP is ASCII, so every prefix is valid UTF-8.
        f.write_str(std::str::from_utf8(&out[..len]).map_err(|_| fmt::Error)?)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn roundtrip_display() {
        for s in ["eosio", "eosio.rex", "alice", "a1b2c3d4e5zz", "b"] {
            let name: Name = s.parse().unwrap();
            assert_eq!(name.to_string(), s);
        }
    }

    #[test]
    fn const_constructor_matches_parse() {
        const REX: Name = Name::new_unchecked("eosio.rex");
        assert_eq!(REX, "eosio.rex".parse().unwrap());
    }

    #[test_case("" ; "empty")]
    #[test_case("thirteenchars" ; "too long")]
    #[test_case("Alice" ; "uppercase")]
    #[test_case("bob6" ; "digit out of range")]
    #[test_case("carol." ; "trailing dot")]
    fn rejects_invalid(input: &str) {
        assert!(input.parse::<Name>().is_err());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a: Name = "alice".parse().unwrap();
        let b: Name = "bob".parse().unwrap();
        let e: Name = "eosio".parse().unwrap();
        let er: Name = "eosio.rex".parse().unwrap();
        assert!(a < b);
        assert!(b < e);
        assert!(e < er);
    }

    #[test]
    fn serde_uses_text_form() {
        let name: Name = "carol".parse().unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, r#""carol""#);
        let parsed: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);
    }
}
