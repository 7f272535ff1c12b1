//! # gatekeep - parallel pre-commit checks
//!
//! gatekeep runs a set of configured checks against the files staged for a
//! commit. Built-in checks wrap command-line tools (`gofmt`, `golangci-lint`,
//! ...); plugins are external executables speaking a small JSON protocol on
//! stdin/stdout. Both run side by side on one worker pool.
//!
//! ## Quick Start
//!
//! ```bash
//! # Install the hook in your repository
//! gatekeep install
//!
//! # Run checks on staged files by hand
//! gatekeep run
//!
//! # Run one check over every tracked file
//! gatekeep run fmt --all-files
//! ```
//!
//! The library side is [`engine::Engine`]; the CLI is a thin layer over it.

pub mod cli;
pub mod config;
pub mod engine;
pub mod git;
pub mod plugins;
pub mod shared;

pub use cli::{Cli, Output};
pub use config::GatekeepConfig;
pub use engine::{Engine, RunOptions, RunReport};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
