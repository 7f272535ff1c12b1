use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Running,
    Passed,
    Failed,
    Skipped,
}

impl CheckStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// One status change of one check. `Running` carries a zero duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub name: String,
    pub status: CheckStatus,
    pub duration: Duration,
    /// Position of the check in the selection
    pub index: usize,
    pub total: usize,
}

/// Receives progress events on the thread that called `Engine::run`.
/// Never invoked concurrently.
pub type ProgressCallback = Box<dyn FnMut(&ProgressEvent) + Send>;
