//! Plugin manifests (`plugin.yaml`, `plugin.yml` or `plugin.json`)

use crate::shared::{FileFilter, parse_duration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Manifest file names in lookup order; the first one present wins.
pub const MANIFEST_FILES: [&str; 3] = ["plugin.yaml", "plugin.yml", "plugin.json"];

pub const CATEGORIES: [&str; 6] = [
    "formatting",
    "linting",
    "security",
    "testing",
    "documentation",
    "custom",
];

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("no plugin manifest in {} (expected one of {})", .dir.display(), MANIFEST_FILES.join(", "))]
    NotFound { dir: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid plugin manifest {}: {}", .path.display(), .problems.join("; "))]
    Invalid { path: PathBuf, problems: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub file_patterns: Vec<String>,
    pub executable: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    pub requires_files: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Passed to the plugin as environment variables and as the request's `config`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

impl PluginManifest {
    /// First manifest file present in `dir`.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        MANIFEST_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Parse a manifest, choosing JSON or YAML by extension.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ManifestError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Every problem with the manifest, empty when it is valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (field, value) in [
            ("name", &self.name),
            ("version", &self.version),
            ("description", &self.description),
            ("executable", &self.executable),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("'{field}' is required"));
            }
        }

        if self.file_patterns.is_empty() {
            problems.push("at least one entry in 'file_patterns' is required".to_string());
        } else if let Err(e) = FileFilter::new(&self.file_patterns) {
            problems.push(e.to_string());
        }

        if let Some(timeout) = &self.timeout {
            match parse_duration(timeout) {
                Ok(d) if d.is_zero() => problems.push("'timeout' must be positive".to_string()),
                Ok(_) => {}
                Err(e) => problems.push(format!("'timeout': {e}")),
            }
        }

        if !self.category.is_empty() && !CATEGORIES.contains(&self.category.as_str()) {
            problems.push(format!(
                "unknown category '{}' (expected one of {})",
                self.category,
                CATEGORIES.join(", ")
            ));
        }

        problems
    }

    pub fn validate(&self, path: &Path) -> Result<(), ManifestError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid {
                path: path.to_path_buf(),
                problems,
            })
        }
    }

    /// The manifest timeout, or `default` when none is set.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout
            .as_deref()
            .and_then(|t| parse_duration(t).ok())
            .unwrap_or(default)
    }
}
