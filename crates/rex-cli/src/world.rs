//! The on-disk world: ledger state plus the simulated chain around it.

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use rex_core::{Asset, Name, Symbol};
use rex_ledger::{InMemoryHost, RexConfig, RexEngine, RexState, snapshot};
use serde::{Deserialize, Serialize};

/// Everything `rexctl` persists between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Ledger tables.
    pub state: RexState,
    /// Token balances, resources and votes.
    pub host: InMemoryHost,
}

impl World {
    /// Fresh world with `balances` issued in `core`.
    ///
    /// # Errors
    ///
    /// Returns error if a balance is not in `core` or cannot be issued.
    pub fn genesis(core: Symbol, balances: &[(Name, Asset)], config: &RexConfig) -> Result<Self> {
        let mut host = InMemoryHost::new(core);
        for (account, quantity) in balances {
            if quantity.symbol != core {
                bail!("genesis balance {quantity} of {account} is not in {core}");
            }
            host.issue(*account, *quantity)
                .with_context(|| format!("issuing {quantity} to {account}"))?;
        }
        Ok(Self {
            state: RexState::new(config),
            host,
        })
    }

    /// Reads a world file.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        snapshot::load_json(path).with_context(|| format!("loading world {}", path.display()))
    }

    /// Writes the world file atomically.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        snapshot::save_json(self, path).with_context(|| format!("saving world {}", path.display()))
    }

    /// Engine over this world.
    pub fn into_engine(self, config: RexConfig) -> RexEngine<InMemoryHost> {
        RexEngine::from_parts(self.state, self.host, config)
    }

    /// World left behind by `engine`.
    pub fn from_engine(engine: RexEngine<InMemoryHost>) -> Self {
        let (state, host, _) = engine.into_parts();
        Self { state, host }
    }
}

/// Parses `account=quantity`.
///
/// # Errors
///
/// Returns error if either side does not parse.
pub fn parse_balance(entry: &str) -> Result<(Name, Asset)> {
    let Some((name, quantity)) = entry.split_once('=') else {
        bail!("expected NAME=QUANTITY, got {entry:?}");
    };
    let name: Name = name.trim().parse().with_context(|| format!("account in {entry:?}"))?;
    let quantity: Asset = quantity
        .trim()
        .parse()
        .with_context(|| format!("quantity in {entry:?}"))?;
    Ok((name, quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EOS: Symbol = Symbol::new_unchecked(4, "EOS");

    #[test]
    fn parse_balance_accepts_spaces() {
        let (name, quantity) = parse_balance("alice=100.0000 EOS").unwrap();
        assert_eq!(name, Name::new_unchecked("alice"));
        assert_eq!(quantity, Asset::new(100_0000, EOS));
        assert!(parse_balance("alice").is_err());
        assert!(parse_balance("alice=lots").is_err());
    }

    #[test]
    fn genesis_rejects_foreign_symbol() {
        let other = Symbol::new_unchecked(4, "SYS");
        let balances = [(Name::new_unchecked("alice"), Asset::new(1, other))];
        assert!(World::genesis(EOS, &balances, &RexConfig::default()).is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("world.json");
        let balances = [(Name::new_unchecked("alice"), Asset::new(5_0000, EOS))];
        let world = World::genesis(EOS, &balances, &RexConfig::default()).unwrap();
        world.save(&path).unwrap();
        assert_eq!(World::load(&path).unwrap(), world);
    }
}
