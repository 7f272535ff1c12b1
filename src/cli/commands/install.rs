use super::project_root;
use crate::cli::CommandContext;
use crate::git::HookInstall;
use anyhow::{Context, Result};

pub fn execute(force: bool, ctx: &CommandContext) -> Result<()> {
    let (_, repo) = project_root(ctx);
    let repo = repo.context("Not inside a Git repository")?;

    match repo.install_hook(force)? {
        HookInstall::Installed => ctx
            .output
            .success(&format!("Installed {}", repo.hook_path().display())),
        HookInstall::Replaced => ctx
            .output
            .success(&format!("Replaced {}", repo.hook_path().display())),
    }
    ctx.output
        .verbose("The hook runs 'gatekeep run' against staged files on every commit");

    Ok(())
}
