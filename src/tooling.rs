//! Tooling & Integration Layer
//!
//! Command-line surface over the sync engine, state store, and catalog client.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
