//! Check definitions
//!
//! A check is either a wrapped command-line tool or an out-of-process plugin.
//! Both share the same selection, filtering and timeout handling; only the
//! way the process is driven differs.

use crate::plugins::Plugin;
use crate::shared::{FileFilter, PatternError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Placeholder argument replaced by the matched file list.
pub const FILES_PLACEHOLDER: &str = "{files}";

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// How a check is executed. Dispatch happens once, in the scheduler.
#[derive(Debug, Clone)]
pub enum ExecutionStrategy {
    BuiltIn(CommandTemplate),
    Plugin(Arc<Plugin>),
}

impl ExecutionStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BuiltIn(_) => "builtin",
            Self::Plugin(_) => "plugin",
        }
    }

    /// The program that will be invoked, for reporting.
    pub fn command_line(&self) -> String {
        match self {
            Self::BuiltIn(template) => template.program.clone(),
            Self::Plugin(plugin) => plugin.executable_path().display().to_string(),
        }
    }
}

/// What a strategy needs to run one check.
pub struct ExecContext<'a> {
    pub name: &'a str,
    /// Working directory for built-in tools
    pub root: &'a Path,
    pub timeout: Duration,
    /// Run-level token; firing it kills in-flight processes
    pub cancel: &'a CancellationToken,
}

/// What a check produced when it passed.
#[derive(Debug, Clone, Default)]
pub struct CheckOutput {
    pub output: String,
    pub modified: Vec<String>,
}

/// External tool invocation for a built-in check.
#[derive(Debug, Clone, Default)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
    /// Treat any stdout as a failure, for tools like `gofmt -l` that exit 0
    pub fail_on_output: bool,
    pub install_hint: Option<String>,
    pub fix_hint: Option<String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn fail_on_output(mut self, enabled: bool) -> Self {
        self.fail_on_output = enabled;
        self
    }

    pub fn install_hint(mut self, hint: impl Into<String>) -> Self {
        self.install_hint = Some(hint.into());
        self
    }

    pub fn fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Arguments with `{files}` expanded in place.
    pub fn expand_args(&self, files: &[String]) -> Vec<String> {
        let mut expanded = Vec::with_capacity(self.args.len() + files.len());
        for arg in &self.args {
            if arg == FILES_PLACEHOLDER {
                expanded.extend(files.iter().cloned());
            } else {
                expanded.push(arg.clone());
            }
        }
        expanded
    }
}

#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub file_patterns: Vec<String>,
    filter: FileFilter,
    pub requires_files: bool,
    pub timeout: Duration,
    pub strategy: ExecutionStrategy,
}

impl Check {
    pub fn new(name: impl Into<String>, strategy: ExecutionStrategy) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            enabled: true,
            file_patterns: Vec::new(),
            filter: FileFilter::default(),
            requires_files: true,
            timeout: DEFAULT_CHECK_TIMEOUT,
            strategy,
        }
    }

    pub fn builtin(name: impl Into<String>, template: CommandTemplate) -> Self {
        Self::new(name, ExecutionStrategy::BuiltIn(template))
    }

    /// A check backed by a loaded plugin, using the manifest's settings.
    pub fn from_plugin(plugin: Arc<Plugin>) -> Self {
        let manifest = &plugin.manifest;
        Self {
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            enabled: true,
            file_patterns: manifest.file_patterns.clone(),
            filter: plugin.filter.clone(),
            requires_files: manifest.requires_files,
            timeout: plugin.timeout,
            strategy: ExecutionStrategy::Plugin(Arc::clone(&plugin)),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn requires_files(mut self, requires_files: bool) -> Self {
        self.requires_files = requires_files;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn file_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, PatternError> {
        self.filter = FileFilter::new(patterns)?;
        self.file_patterns = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        Ok(self)
    }

    /// Narrow the run's file list to what this check cares about.
    pub fn matching_files(&self, files: &[String]) -> Vec<String> {
        self.filter.filter(files)
    }

    pub fn is_plugin(&self) -> bool {
        matches!(self.strategy, ExecutionStrategy::Plugin(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_args_replaces_placeholder() {
        let template = CommandTemplate::new("gofmt").args(["-l", "{files}"]);
        let files = vec!["a.go".to_string(), "b/c.go".to_string()];
        assert_eq!(template.expand_args(&files), vec!["-l", "a.go", "b/c.go"]);
    }

    #[test]
    fn test_expand_args_without_placeholder() {
        let template = CommandTemplate::new("go").args(["mod", "tidy", "-diff"]);
        assert_eq!(
            template.expand_args(&["main.go".to_string()]),
            vec!["mod", "tidy", "-diff"]
        );
    }

    #[test]
    fn test_check_matching_files() {
        let check = Check::builtin("fmt", CommandTemplate::new("gofmt"))
            .file_patterns(&["*.go"])
            .unwrap();
        let files = vec!["main.go".to_string(), "README.md".to_string()];
        assert_eq!(check.matching_files(&files), vec!["main.go".to_string()]);
    }

    #[test]
    fn test_check_defaults() {
        let check = Check::builtin("fmt", CommandTemplate::new("gofmt"));
        assert!(check.enabled);
        assert!(check.requires_files);
        assert_eq!(check.timeout, DEFAULT_CHECK_TIMEOUT);
        assert_eq!(check.strategy.kind(), "builtin");
        assert!(!check.is_plugin());
    }
}
