use crate::shared::format_duration;
use std::time::Duration;

/// Failures that abort a whole run before or while checks are scheduled.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An explicitly requested check is not registered
    #[error("unknown check '{name}' (available: {})", .available.join(", "))]
    UnknownCheck { name: String, available: Vec<String> },

    /// Selection produced nothing to run
    #[error("no checks to run")]
    NoChecksSelected,

    /// A worker thread panicked; the pool could not be joined cleanly
    #[error("worker thread panicked during check execution")]
    WorkerPanic,
}

/// Why a single check did not pass.
///
/// Each variant carries whatever partial output was captured; the scheduler
/// decides how much of it ends up in the result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckFailure {
    /// The tool or plugin executable could not be found
    #[error("{tool} not found")]
    ToolMissing {
        tool: String,
        suggestion: Option<String>,
    },

    /// The process ran and reported a problem
    #[error("{message}")]
    Execution {
        message: String,
        output: String,
        suggestion: Option<String>,
    },

    #[error("{subject} timed out after {}", display_duration(.timeout))]
    Timeout {
        subject: String,
        timeout: Duration,
        elapsed: Duration,
        output: String,
    },

    #[error("cancelled")]
    Cancelled { output: String },
}

impl CheckFailure {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            output: String::new(),
            suggestion: None,
        }
    }

    /// Only a missing tool can be downgraded to a skip.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::ToolMissing { .. })
    }

    pub fn output(&self) -> &str {
        match self {
            Self::ToolMissing { .. } => "",
            Self::Execution { output, .. }
            | Self::Timeout { output, .. }
            | Self::Cancelled { output } => output,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ToolMissing { suggestion, .. } | Self::Execution { suggestion, .. } => {
                suggestion.clone()
            }
            Self::Timeout {
                timeout, elapsed, ..
            } => Some(format!(
                "Consider increasing the timeout to {}",
                format_duration(suggested_timeout(*timeout, *elapsed))
            )),
            Self::Cancelled { .. } => None,
        }
    }
}

fn display_duration(d: &Duration) -> String {
    format_duration(*d)
}

/// Longer of 1.5x the configured timeout and twice the observed run time,
/// rounded up to whole seconds once above one second.
pub fn suggested_timeout(timeout: Duration, elapsed: Duration) -> Duration {
    let scaled = Duration::try_from_secs_f64(timeout.as_secs_f64() * 1.5).unwrap_or(Duration::MAX);
    let doubled = elapsed.checked_mul(2).unwrap_or(Duration::MAX);
    let suggestion = std::cmp::max(scaled, doubled);
    if suggestion > Duration::from_secs(1) {
        let secs = suggestion.as_secs();
        Duration::from_secs(if suggestion.subsec_nanos() > 0 {
            secs.saturating_add(1)
        } else {
            secs
        })
    } else {
        suggestion
    }
}
