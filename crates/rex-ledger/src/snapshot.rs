//! JSON snapshots of ledger state.
//!
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a reader never sees a half-written snapshot.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{RexError, Result};
use crate::state::RexState;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `value` as pretty JSON to `path`, atomically.
///
/// # Errors
///
/// Returns error if encoding or any file operation fails.
pub fn save_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "snapshot written");
    Ok(())
}

/// Reads a JSON snapshot from `path`.
///
/// # Errors
///
/// Returns [`RexError::Io`] if the file cannot be read and
/// [`RexError::Snapshot`] if it does not decode.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| RexError::Snapshot(format!("{}: {e}", path.display())))
}

/// Saves ledger state.
///
/// # Errors
///
/// See [`save_json`].
pub fn save(state: &RexState, path: impl AsRef<Path>) -> Result<()> {
    save_json(state, path)
}

/// Loads ledger state, upgrading older record versions.
///
/// # Errors
///
/// See [`load_json`].
pub fn load(path: impl AsRef<Path>) -> Result<RexState> {
    load_json(path)
}
