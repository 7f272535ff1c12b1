use super::GitRepo;
use anyhow::{Context, Result};
use git2::{Status, StatusOptions};

impl GitRepo {
    /// Paths staged for commit, relative to the working directory. Deleted
    /// files are left out since there is nothing on disk to check.
    pub fn staged_files(&self) -> Result<Vec<String>> {
        let mut status_opts = StatusOptions::new();
        status_opts.include_ignored(false);
        status_opts.include_untracked(false);

        let statuses = self
            .repo
            .statuses(Some(&mut status_opts))
            .context("Failed to get repository status")?;

        let mut files = Vec::new();
        for entry in statuses.iter() {
            let status = entry.status();
            if status.intersects(
                Status::INDEX_NEW
                    | Status::INDEX_MODIFIED
                    | Status::INDEX_RENAMED
                    | Status::INDEX_TYPECHANGE,
            ) {
                if let Some(path) = entry.path() {
                    files.push(path.to_string());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Every path in the index.
    pub fn all_files(&self) -> Result<Vec<String>> {
        let index = self.repo.index().context("Failed to read the index")?;
        let mut files: Vec<String> = index
            .iter()
            .filter_map(|entry| String::from_utf8(entry.path).ok())
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }
}
