//! JSON request/response protocol for plugin executables
//!
//! Request, written to stdin (then closed):
//!
//! ```json
//! {"command": "check", "files": ["a.go"], "config": {"KEY": "value"}}
//! ```
//!
//! Response, read from stdout until EOF:
//!
//! ```json
//! {"success": false, "error": "...", "suggestion": "...", "modified": ["a.go"], "output": "..."}
//! ```
//!
//! Only `success` is required. A plugin that exits 0 without printing
//! anything is treated as passing.

use super::Plugin;
use crate::engine::{CheckFailure, CheckOutput, ExecContext};
use crate::engine::process::{self, CapturedOutput, ProcessOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::process::{Command, ExitStatus};

#[derive(Debug, Serialize)]
pub struct PluginRequest<'a> {
    pub command: &'static str,
    pub files: &'a [String],
    pub config: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub output: Option<String>,
}

pub fn execute(
    plugin: &Plugin,
    files: &[String],
    ctx: &ExecContext<'_>,
) -> Result<CheckOutput, CheckFailure> {
    let executable = plugin.executable_path();
    let missing = || CheckFailure::ToolMissing {
        tool: executable.display().to_string(),
        suggestion: dependency_hint(plugin),
    };

    if !executable.exists() {
        return Err(missing());
    }

    let request = PluginRequest {
        command: "check",
        files,
        config: &plugin.manifest.environment,
    };
    let payload = serde_json::to_vec(&request).map_err(|e| {
        CheckFailure::execution(format!("failed to encode request for plugin '{}': {e}", plugin.name()))
    })?;

    let mut command = Command::new(&executable);
    command
        .args(&plugin.manifest.args)
        .current_dir(&plugin.dir)
        .envs(expanded_environment(&plugin.manifest.environment));

    tracing::debug!(
        "Running plugin '{}' on {} file(s) with timeout {:?}",
        plugin.name(),
        files.len(),
        ctx.timeout
    );

    let outcome = match process::run_supervised(command, Some(payload), ctx.timeout, ctx.cancel) {
        Ok(outcome) => outcome,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing()),
        Err(e) => {
            return Err(CheckFailure::execution(format!(
                "failed to start plugin '{}': {e}",
                plugin.name()
            )));
        }
    };

    match outcome {
        ProcessOutcome::Exited { status, output } => interpret(plugin, status, &output),
        ProcessOutcome::TimedOut { elapsed, output } => Err(CheckFailure::Timeout {
            subject: format!("plugin '{}'", plugin.name()),
            timeout: ctx.timeout,
            elapsed,
            output: output.combined(),
        }),
        ProcessOutcome::Cancelled { output } => Err(CheckFailure::Cancelled {
            output: output.combined(),
        }),
    }
}

fn interpret(
    plugin: &Plugin,
    status: ExitStatus,
    output: &CapturedOutput,
) -> Result<CheckOutput, CheckFailure> {
    let stdout = output.stdout_text();
    let stderr = output.stderr_text();
    let body = stdout.trim();

    let parsed = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_str::<PluginResponse>(body))
    };

    if !status.success() {
        let exit = match status.code() {
            Some(code) => format!("plugin '{}' exited with status {code}", plugin.name()),
            None => format!("plugin '{}' was terminated by a signal", plugin.name()),
        };
        return Err(match parsed {
            Some(Ok(response)) => CheckFailure::Execution {
                message: response.error.unwrap_or(exit),
                output: response.output.unwrap_or(stderr),
                suggestion: response.suggestion,
            },
            _ => CheckFailure::Execution {
                message: exit,
                output: output.combined(),
                suggestion: None,
            },
        });
    }

    match parsed {
        None => Ok(CheckOutput {
            output: stderr,
            modified: Vec::new(),
        }),
        Some(Err(e)) => Err(CheckFailure::Execution {
            message: format!("plugin '{}' returned an invalid response: {e}", plugin.name()),
            output: output.combined(),
            suggestion: Some(
                "Plugins must print a single JSON object with at least a boolean 'success' field"
                    .to_string(),
            ),
        }),
        Some(Ok(response)) if response.success => Ok(CheckOutput {
            output: response.output.unwrap_or_default(),
            modified: response.modified,
        }),
        Some(Ok(response)) => Err(CheckFailure::Execution {
            message: response
                .error
                .unwrap_or_else(|| format!("plugin '{}' reported failure", plugin.name())),
            output: response.output.unwrap_or_default(),
            suggestion: response.suggestion,
        }),
    }
}

/// Manifest environment with `$VAR` and `${VAR}` expanded; unset variables
/// expand to an empty string.
fn expanded_environment(environment: &BTreeMap<String, String>) -> Vec<(String, String)> {
    environment
        .iter()
        .map(|(key, value)| {
            let expanded = shellexpand::env_with_context_no_errors(value, |var: &str| {
                Some(std::env::var(var).unwrap_or_default())
            });
            (key.clone(), expanded.into_owned())
        })
        .collect()
}

fn dependency_hint(plugin: &Plugin) -> Option<String> {
    let deps = &plugin.manifest.dependencies;
    if deps.is_empty() {
        None
    } else {
        Some(format!(
            "Plugin '{}' requires: {}",
            plugin.name(),
            deps.join(", ")
        ))
    }
}
