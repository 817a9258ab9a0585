//! Tooling & Integration Layer
//!
//! Command-line front-end over the library: merging snapshots, downloading
//! partitions, comparing and hashing catalogues.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
