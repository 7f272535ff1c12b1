//! Command implementations for the gatekeep CLI

pub mod install;
pub mod list;
pub mod plugin;
pub mod run;
pub mod uninstall;
pub mod version;

use super::CommandContext;
use crate::config::GatekeepConfig;
use crate::git::GitRepo;
use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `-v`.
pub fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info,globset=warn"),
        2 => EnvFilter::new("debug,globset=warn"),
        _ => EnvFilter::new("trace"),
    });

    // Already installed when called twice in one process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// The repository workdir containing the start directory, or the start
/// directory itself outside git.
pub(crate) fn project_root(ctx: &CommandContext) -> (PathBuf, Option<GitRepo>) {
    match GitRepo::discover(&ctx.root) {
        Ok(repo) => match repo.workdir() {
            Ok(workdir) => (workdir.to_path_buf(), Some(repo)),
            Err(_) => (ctx.root.clone(), None),
        },
        Err(e) => {
            tracing::debug!("{:#}", e);
            (ctx.root.clone(), None)
        }
    }
}

pub(crate) fn load_config(ctx: &CommandContext, root: &std::path::Path) -> Result<GatekeepConfig> {
    let config = GatekeepConfig::load(root, ctx.config_path.as_deref())?;
    config.validate()?;
    Ok(config)
}
