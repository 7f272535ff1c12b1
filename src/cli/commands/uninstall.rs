use super::project_root;
use crate::cli::CommandContext;
use anyhow::{Context, Result};

pub fn execute(ctx: &CommandContext) -> Result<()> {
    let (_, repo) = project_root(ctx);
    let repo = repo.context("Not inside a Git repository")?;

    if repo.remove_hook()? {
        ctx.output
            .success(&format!("Removed {}", repo.hook_path().display()));
    } else {
        ctx.output.info("No pre-commit hook installed");
    }

    Ok(())
}
