//! Out-of-process checks
//!
//! A plugin is a directory holding a manifest and an executable. The
//! executable receives a JSON request on stdin and answers with a JSON
//! response on stdout; see [`adapter`] for the protocol.

pub mod adapter;
pub mod loader;
pub mod manifest;

pub use loader::{LoadError, PluginLoader};
pub use manifest::{ManifestError, PluginManifest};

use crate::shared::FileFilter;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// A validated plugin, ready to run.
#[derive(Debug)]
pub struct Plugin {
    pub manifest: PluginManifest,
    pub dir: PathBuf,
    pub timeout: Duration,
    pub filter: FileFilter,
}

impl Plugin {
    /// Load and validate the manifest found in `dir`.
    pub fn load(dir: &Path, default_timeout: Duration) -> Result<Self, ManifestError> {
        let path = PluginManifest::find(dir).ok_or_else(|| ManifestError::NotFound {
            dir: dir.to_path_buf(),
        })?;
        let manifest = PluginManifest::from_file(&path)?;
        manifest.validate(&path)?;
        Self::from_manifest(manifest, dir, default_timeout).map_err(|problems| {
            ManifestError::Invalid { path, problems }
        })
    }

    pub fn from_manifest(
        manifest: PluginManifest,
        dir: &Path,
        default_timeout: Duration,
    ) -> Result<Self, Vec<String>> {
        let filter = FileFilter::new(&manifest.file_patterns).map_err(|e| vec![e.to_string()])?;
        let timeout = manifest.timeout_or(default_timeout);
        Ok(Self {
            manifest,
            dir: dir.to_path_buf(),
            timeout,
            filter,
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// The executable, resolved against the plugin directory when relative.
    pub fn executable_path(&self) -> PathBuf {
        let executable = Path::new(&self.manifest.executable);
        if executable.is_absolute() {
            executable.to_path_buf()
        } else {
            self.dir.join(executable)
        }
    }
}
