//! Plugin discovery: one plugin per subdirectory of the plugin root

use super::{ManifestError, Plugin};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read plugin directory {}: {source}", .dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate plugin names:\n  - {}", .duplicates.join("\n  - "))]
    Duplicates { duplicates: Vec<String> },
}

/// Result of scanning the plugin root: what loaded and what did not.
#[derive(Debug, Default)]
pub struct Discovery {
    pub plugins: Vec<Arc<Plugin>>,
    /// Directories whose manifest could not be loaded
    pub problems: Vec<String>,
    /// Names claimed by more than one manifest; only the first was kept
    pub duplicates: Vec<String>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.problems.is_empty() && self.duplicates.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Plugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }
}

pub struct PluginLoader {
    root: PathBuf,
    default_timeout: Duration,
}

impl PluginLoader {
    pub fn new(root: impl Into<PathBuf>, default_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            default_timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Plugins for a run. Two manifests with the same name are an error;
    /// unreadable manifests are left in `problems` for the caller to report.
    pub fn load(&self) -> Result<Discovery, LoadError> {
        let mut discovery = self.discover()?;
        if discovery.duplicates.is_empty() {
            Ok(discovery)
        } else {
            Err(LoadError::Duplicates {
                duplicates: std::mem::take(&mut discovery.duplicates),
            })
        }
    }

    /// Scan the root in directory-name order. A missing root yields nothing.
    /// Hidden directories and directories without a manifest are skipped.
    pub fn discover(&self) -> Result<Discovery, LoadError> {
        let mut discovery = Discovery::default();
        if !self.root.is_dir() {
            tracing::debug!("Plugin directory {} does not exist", self.root.display());
            return Ok(discovery);
        }

        let entries = std::fs::read_dir(&self.root).map_err(|source| LoadError::Io {
            dir: self.root.clone(),
            source,
        })?;

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'))
            })
            .collect();
        dirs.sort();

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for dir in dirs {
            match Plugin::load(&dir, self.default_timeout) {
                Ok(plugin) => {
                    if let Some(first) = seen.get(plugin.name()) {
                        discovery.duplicates.push(format!(
                            "duplicate plugin name '{}' in {} (already defined in {})",
                            plugin.name(),
                            dir.display(),
                            first.display()
                        ));
                        continue;
                    }
                    tracing::debug!("Loaded plugin '{}' from {}", plugin.name(), dir.display());
                    seen.insert(plugin.name().to_string(), dir);
                    discovery.plugins.push(Arc::new(plugin));
                }
                Err(ManifestError::NotFound { .. }) => {
                    tracing::trace!("No manifest in {}, ignoring", dir.display());
                }
                Err(e) => discovery.problems.push(e.to_string()),
            }
        }

        Ok(discovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_plugin(root: &Path, dir: &str, name: &str) {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(
            path.join("plugin.yaml"),
            format!(
                "name: {name}\nversion: 1.0.0\ndescription: test\nexecutable: ./run.sh\nfile_patterns: ['*.txt']\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let loader = PluginLoader::new(dir.path().join("nope"), Duration::from_secs(1));
        assert!(loader.load().unwrap().is_empty());
    }

    #[test]
    fn test_plugins_load_in_directory_order() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "b-second", "second");
        write_plugin(dir.path(), "a-first", "first");
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::create_dir_all(dir.path().join(".hidden")).unwrap();

        let loader = PluginLoader::new(dir.path(), Duration::from_secs(1));
        let plugins = loader.load().unwrap().plugins;
        let names: Vec<_> = plugins.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_duplicates_and_invalid_manifests_are_collected() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "one", "same");
        write_plugin(dir.path(), "two", "same");
        let broken = dir.path().join("three");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join("plugin.json"), "{\"name\": \"x\"}").unwrap();

        let loader = PluginLoader::new(dir.path(), Duration::from_secs(1));
        let discovery = loader.discover().unwrap();
        assert_eq!(discovery.plugins.len(), 1);
        assert_eq!(discovery.problems.len(), 1);
        assert!(discovery.problems[0].contains("invalid plugin manifest"));
        assert_eq!(discovery.duplicates.len(), 1);
        assert!(discovery.duplicates[0].contains("duplicate plugin name 'same'"));

        match loader.load() {
            Err(LoadError::Duplicates { duplicates }) => assert_eq!(duplicates.len(), 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_manifest_does_not_fail_load() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "good", "good");
        let broken = dir.path().join("broken");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join("plugin.yaml"), "version: 1.0.0\n").unwrap();

        let loader = PluginLoader::new(dir.path(), Duration::from_secs(1));
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.plugins.len(), 1);
        assert!(loaded.get("good").is_some());
        assert_eq!(loaded.problems.len(), 1);
    }
}
