//! Configuration for gatekeep
//!
//! Settings are layered with figment (see [`GatekeepConfig::load`]) and then
//! turned into a [`CheckRegistry`] of built-in and plugin checks.

mod core;
pub mod smart_load;

use crate::engine::{Check, CheckRegistry, CommandTemplate};
use crate::plugins::PluginLoader;
use crate::shared::{FileFilter, parse_duration};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeepConfig {
    /// Global switch; when false the hook exits without running anything
    pub enabled: bool,

    /// Default per-check timeout
    pub timeout: String,

    /// Upper bound for a whole run
    pub run_timeout: String,

    /// Files matching these never reach any check
    pub exclude_patterns: Vec<String>,

    pub performance: PerformanceConfig,

    /// Built-in checks by name
    pub checks: BTreeMap<String, CheckConfig>,

    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// 0 = auto
    pub parallel_workers: usize,
    pub fail_fast: bool,
    pub graceful_degradation: bool,
}

/// A wrapped command-line tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub enabled: bool,
    pub description: String,
    pub command: String,
    /// `{files}` expands to the matched files
    pub args: Vec<String>,
    pub file_patterns: Vec<String>,
    pub requires_files: bool,
    /// Overrides the global timeout
    pub timeout: Option<String>,
    pub fail_on_output: bool,
    pub install_hint: Option<String>,
    pub fix_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub enabled: bool,
    /// Relative to the repository root
    pub directory: String,
    /// Used when a manifest does not set its own timeout
    pub timeout: String,
}

impl Default for GatekeepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: "30s".to_string(),
            run_timeout: "5m".to_string(),
            exclude_patterns: Vec::new(),
            performance: PerformanceConfig::default(),
            checks: BTreeMap::new(),
            plugins: PluginsConfig::default(),
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            description: String::new(),
            command: String::new(),
            args: Vec::new(),
            file_patterns: Vec::new(),
            requires_files: true,
            timeout: None,
            fail_on_output: false,
            install_hint: None,
            fix_hint: None,
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: ".pre-commit-plugins".to_string(),
            timeout: "60s".to_string(),
        }
    }
}

impl GatekeepConfig {
    pub fn default_timeout(&self) -> Result<Duration> {
        positive_duration(&self.timeout).context("invalid 'timeout'")
    }

    pub fn run_timeout(&self) -> Result<Duration> {
        positive_duration(&self.run_timeout).context("invalid 'run_timeout'")
    }

    pub fn plugin_timeout(&self) -> Result<Duration> {
        positive_duration(&self.plugins.timeout).context("invalid 'plugins.timeout'")
    }

    /// Reject settings that would only fail later, mid-run.
    pub fn validate(&self) -> Result<()> {
        self.default_timeout()?;
        self.run_timeout()?;
        self.plugin_timeout()?;

        FileFilter::new(&self.exclude_patterns).context("invalid 'exclude_patterns'")?;

        for (name, check) in &self.checks {
            if check.command.trim().is_empty() {
                anyhow::bail!("check '{}' has no command", name);
            }
            if let Some(timeout) = &check.timeout {
                positive_duration(timeout)
                    .with_context(|| format!("invalid timeout for check '{name}'"))?;
            }
            FileFilter::new(&check.file_patterns)
                .with_context(|| format!("invalid file_patterns for check '{name}'"))?;
        }

        Ok(())
    }

    pub fn plugin_loader(&self, root: &Path) -> Result<PluginLoader> {
        Ok(PluginLoader::new(
            root.join(&self.plugins.directory),
            self.plugin_timeout()?,
        ))
    }

    /// Built-in checks in name order, followed by plugins in directory order
    /// when the plugin subsystem is enabled.
    pub fn build_registry(&self, root: &Path) -> Result<CheckRegistry> {
        self.validate()?;
        let default_timeout = self.default_timeout()?;
        let mut registry = CheckRegistry::new();

        for (name, settings) in &self.checks {
            let timeout = match &settings.timeout {
                Some(t) => positive_duration(t)?,
                None => default_timeout,
            };
            let mut template = CommandTemplate::new(&settings.command)
                .args(settings.args.iter().cloned())
                .fail_on_output(settings.fail_on_output);
            template.install_hint = settings.install_hint.clone();
            template.fix_hint = settings.fix_hint.clone();

            let check = Check::builtin(name.as_str(), template)
                .description(&settings.description)
                .enabled(settings.enabled)
                .requires_files(settings.requires_files)
                .timeout(timeout)
                .file_patterns(&settings.file_patterns)?;
            registry.register(check)?;
        }

        if self.plugins.enabled {
            let discovery = self.plugin_loader(root)?.load()?;
            for problem in &discovery.problems {
                tracing::warn!("Skipping plugin: {}", problem);
            }
            for plugin in discovery.plugins {
                registry
                    .register(Check::from_plugin(Arc::clone(&plugin)))
                    .with_context(|| {
                        format!("plugin '{}' clashes with a built-in check", plugin.name())
                    })?;
            }
        }

        Ok(registry)
    }
}

fn positive_duration(value: &str) -> Result<Duration> {
    let duration = parse_duration(value).map_err(anyhow::Error::msg)?;
    if duration.is_zero() {
        anyhow::bail!("duration must be greater than zero");
    }
    Ok(duration)
}
