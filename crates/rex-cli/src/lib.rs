//! # rex-cli
//!
//! `rexctl`: applies resource exchange actions to a world file on disk.
//!
//! Each invocation loads the world (ledger state and the simulated chain
//! around it), runs one command, and writes the world back only if the
//! command succeeded.
//!
//! ```text
//! rexctl --state world.json genesis --core 4,EOS --account "alice=1000.0000 EOS"
//! rexctl --state world.json --now 2024-01-01T00:00:00Z init 4,EOS
//! rexctl --state world.json deposit alice "100.0000 EOS"
//! rexctl --state world.json show account alice
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod world;

pub use cli::{Cli, Commands, ShowCommands};
pub use world::World;
