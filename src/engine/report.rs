//! Per-check results and the run summary
//!
//! Workers write into pre-sized slots indexed by selection position, so the
//! report comes out in selection order no matter which check finished first.

use super::progress::CheckStatus;
use serde::{Serialize, Serializer};
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

impl From<Outcome> for CheckStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Passed => CheckStatus::Passed,
            Outcome::Failed => CheckStatus::Failed,
            Outcome::Skipped => CheckStatus::Skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub success: bool,
    /// Never dispatched (fail-fast or cancellation)
    pub skipped: bool,
    /// Ran through the skip path: no matching files, or a missing tool under
    /// graceful degradation
    pub gracefully_skipped: bool,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modified: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl CheckResult {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            skipped: false,
            gracefully_skipped: false,
            duration: Duration::ZERO,
            files: Vec::new(),
            error: None,
            output: String::new(),
            suggestion: None,
            modified: Vec::new(),
            command: None,
        }
    }

    pub fn passed(name: &str, duration: Duration, files: Vec<String>) -> Self {
        Self {
            success: true,
            duration,
            files,
            ..Self::empty(name)
        }
    }

    pub fn failed(name: &str, duration: Duration, files: Vec<String>, error: String) -> Self {
        Self {
            duration,
            files,
            error: Some(error),
            ..Self::empty(name)
        }
    }

    /// Counted as a skip but reported successful.
    pub fn gracefully_skipped(name: &str, duration: Duration, files: Vec<String>) -> Self {
        Self {
            success: true,
            gracefully_skipped: true,
            duration,
            files,
            ..Self::empty(name)
        }
    }

    /// A check that was selected but never dispatched.
    pub fn not_run(name: &str) -> Self {
        Self {
            skipped: true,
            ..Self::empty(name)
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.skipped || self.gracefully_skipped {
            Outcome::Skipped
        } else if self.success {
            Outcome::Passed
        } else {
            Outcome::Failed
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: Vec<CheckResult>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(rename = "total_duration_ms", serialize_with = "as_millis")]
    pub total_duration: Duration,
    pub total_files: usize,
}

impl RunReport {
    /// Builds the summary counts from results already in selection order.
    pub fn new(results: Vec<CheckResult>, total_duration: Duration, total_files: usize) -> Self {
        let (mut passed, mut failed, mut skipped) = (0, 0, 0);
        for result in &results {
            match result.outcome() {
                Outcome::Passed => passed += 1,
                Outcome::Failed => failed += 1,
                Outcome::Skipped => skipped += 1,
            }
        }
        Self {
            results,
            passed,
            failed,
            skipped,
            total_duration,
            total_files,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results
            .iter()
            .filter(|r| r.outcome() == Outcome::Failed)
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// Write-once result storage, one slot per selected check.
pub(crate) struct ResultSlots {
    slots: Vec<OnceLock<CheckResult>>,
}

impl ResultSlots {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Returns false if the slot was already filled.
    pub fn fill(&self, index: usize, result: CheckResult) -> bool {
        self.slots
            .get(index)
            .is_some_and(|slot| slot.set(result).is_ok())
    }

    pub fn is_filled(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|slot| slot.get().is_some())
    }

    /// Empty slots become not-run skips named after `names[index]`.
    pub fn into_results(self, names: &[&str]) -> Vec<CheckResult> {
        self.slots
            .into_iter()
            .zip(names)
            .map(|(slot, name)| {
                slot.into_inner()
                    .unwrap_or_else(|| CheckResult::not_run(name))
            })
            .collect()
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
