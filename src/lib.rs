//! Coursemirror: Incremental Course File Mirror
//!
//! Mirrors course files from a learning-management system to local storage. Each run
//! compares the remote catalog against the state recorded by earlier runs and fetches
//! only files that are new or missing on disk.

pub mod atomic;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod progress;
pub mod report;
pub mod state;
pub mod sync;
pub mod tooling;
pub mod types;
