//! Check execution engine
//!
//! Resolves which checks run, schedules them on a bounded worker pool and
//! aggregates one result per selected check, in selection order.
//!
//! ```no_run
//! use gatekeep::engine::{Check, CheckRegistry, CommandTemplate, Engine, RunOptions};
//!
//! let mut registry = CheckRegistry::new();
//! registry
//!     .register(
//!         Check::builtin("fmt", CommandTemplate::new("gofmt").args(["-l", "{files}"]).fail_on_output(true))
//!             .file_patterns(&["*.go"])?,
//!     )?;
//!
//! let engine = Engine::new(registry);
//! let report = engine.run(RunOptions {
//!     files: vec!["main.go".into()],
//!     ..Default::default()
//! })?;
//! assert_eq!(report.results.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builtin;
pub mod check;
pub mod error;
pub mod process;
pub mod progress;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod selection;

pub use check::{
    Check, CheckOutput, CommandTemplate, DEFAULT_CHECK_TIMEOUT, ExecContext, ExecutionStrategy,
};
pub use error::{CheckFailure, EngineError};
pub use progress::{CheckStatus, ProgressCallback, ProgressEvent};
pub use registry::{CheckRegistry, DuplicateCheck};
pub use report::{CheckResult, Outcome, RunReport};

use crate::shared::{FileFilter, PatternError};
use scheduler::RunPolicy;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything a single run needs besides the registry.
pub struct RunOptions {
    /// Candidate paths, relative to the engine root
    pub files: Vec<String>,
    /// Run exactly this check, even if disabled
    pub check: Option<String>,
    pub only: Vec<String>,
    pub skip: Vec<String>,
    /// Worker count; 0 picks one per CPU, capped at the number of checks
    pub parallelism: usize,
    pub fail_fast: bool,
    pub graceful_degradation: bool,
    pub debug_timeout_detail: bool,
    /// Replaces every check's own timeout
    pub timeout_override: Option<Duration>,
    pub cancel: CancellationToken,
    pub progress: Option<ProgressCallback>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            check: None,
            only: Vec::new(),
            skip: Vec::new(),
            parallelism: 0,
            fail_fast: false,
            graceful_degradation: false,
            debug_timeout_detail: false,
            timeout_override: None,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("files", &self.files.len())
            .field("check", &self.check)
            .field("only", &self.only)
            .field("skip", &self.skip)
            .field("parallelism", &self.parallelism)
            .field("fail_fast", &self.fail_fast)
            .field("graceful_degradation", &self.graceful_degradation)
            .field("debug_timeout_detail", &self.debug_timeout_detail)
            .field("timeout_override", &self.timeout_override)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

pub struct Engine {
    registry: CheckRegistry,
    root: PathBuf,
    exclude: FileFilter,
}

impl Engine {
    pub fn new(registry: CheckRegistry) -> Self {
        Self {
            registry,
            root: PathBuf::from("."),
            exclude: FileFilter::default(),
        }
    }

    /// Directory built-in tools run in.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Files matching any of these are dropped before checks see them.
    pub fn with_exclude_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, PatternError> {
        self.exclude = FileFilter::new(patterns)?;
        Ok(self)
    }

    /// Execute one run. Per-check problems end up in the report; only
    /// selection problems and a broken worker pool are errors.
    pub fn run(&self, options: RunOptions) -> Result<RunReport, EngineError> {
        let selected = selection::resolve(
            &self.registry,
            options.check.as_deref(),
            &options.only,
            &options.skip,
        )?;

        let files = self.exclude.exclude(&options.files);
        if files.len() != options.files.len() {
            tracing::debug!(
                "Excluded {} of {} file(s)",
                options.files.len() - files.len(),
                options.files.len()
            );
        }

        let policy = RunPolicy {
            root: &self.root,
            parallelism: options.parallelism,
            fail_fast: options.fail_fast,
            graceful_degradation: options.graceful_degradation,
            debug_timeout_detail: options.debug_timeout_detail,
            timeout_override: options.timeout_override,
            cancel: &options.cancel,
        };

        let mut report = scheduler::run(&selected, &files, &policy, options.progress)?;
        report.total_files = options.files.len();
        Ok(report)
    }
}
