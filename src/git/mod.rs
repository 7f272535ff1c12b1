//! Git integration for gatekeep
//!
//! Repository discovery, the staged file list that feeds a run, and the
//! pre-commit hook that triggers one.

use anyhow::{Context, Result};
use git2::Repository;
use std::path::{Path, PathBuf};

pub mod operations;

pub const HOOK_NAME: &str = "pre-commit";

/// Marks hooks gatekeep wrote, so it never touches anyone else's
pub const HOOK_MARKER: &str = "# installed by gatekeep";

pub struct GitRepo {
    pub repo: Repository,
}

/// What `install_hook` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookInstall {
    Installed,
    Replaced,
}

impl GitRepo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open Git repository")?;
        Ok(Self { repo })
    }

    /// Find the repository containing `path`, walking up as git does.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path).context("No Git repository found")?;
        Ok(Self { repo })
    }

    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .context("Repository has no working directory (bare repository?)")
    }

    pub fn hook_path(&self) -> PathBuf {
        self.repo.path().join("hooks").join(HOOK_NAME)
    }

    pub fn hook_exists(&self) -> bool {
        self.hook_path().exists()
    }

    /// True when the installed hook carries our marker.
    pub fn hook_is_ours(&self) -> bool {
        std::fs::read_to_string(self.hook_path())
            .map(|content| content.contains(HOOK_MARKER))
            .unwrap_or(false)
    }

    /// Write the pre-commit hook. A hook gatekeep did not write is only
    /// replaced with `force`.
    pub fn install_hook(&self, force: bool) -> Result<HookInstall> {
        let hook_path = self.hook_path();
        let existed = hook_path.exists();

        if existed && !force && !self.hook_is_ours() {
            anyhow::bail!(
                "{} already exists and was not installed by gatekeep (use --force to replace it)",
                hook_path.display()
            );
        }

        if let Some(hooks_dir) = hook_path.parent() {
            std::fs::create_dir_all(hooks_dir).context("Failed to create hooks directory")?;
        }
        std::fs::write(&hook_path, hook_script()).context("Failed to write hook file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&hook_path)
                .context("Failed to get hook file metadata")?
                .permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&hook_path, perms)
                .context("Failed to set hook file permissions")?;
        }

        tracing::debug!("Wrote {}", hook_path.display());
        Ok(if existed {
            HookInstall::Replaced
        } else {
            HookInstall::Installed
        })
    }

    /// Remove the hook if we installed it. Returns whether anything was removed.
    pub fn remove_hook(&self) -> Result<bool> {
        let hook_path = self.hook_path();
        if !hook_path.exists() {
            return Ok(false);
        }
        if !self.hook_is_ours() {
            anyhow::bail!(
                "{} was not installed by gatekeep, leaving it in place",
                hook_path.display()
            );
        }
        std::fs::remove_file(&hook_path).context("Failed to remove hook file")?;
        Ok(true)
    }
}

fn hook_script() -> String {
    format!("#!/bin/sh\n{HOOK_MARKER}\nexec gatekeep run \"$@\"\n")
}
