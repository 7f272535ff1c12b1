//! Built-in checks: wrapped command-line tools
//!
//! The tool is looked up on `PATH` first so a missing binary is reported as
//! such (and can be skipped under graceful degradation) rather than as a
//! generic spawn failure.

use super::check::{CheckOutput, CommandTemplate, ExecContext};
use super::error::CheckFailure;
use super::process::{self, ProcessOutcome};
use std::io;
use std::process::Command;

pub fn execute(
    template: &CommandTemplate,
    files: &[String],
    ctx: &ExecContext<'_>,
) -> Result<CheckOutput, CheckFailure> {
    let missing = || CheckFailure::ToolMissing {
        tool: template.program.clone(),
        suggestion: template.install_hint.clone(),
    };

    let program = which::which_in(&template.program, std::env::var_os("PATH"), ctx.root)
        .map_err(|_| missing())?;

    let args = template.expand_args(files);
    tracing::debug!(
        "Running '{}' for check '{}' on {} file(s)",
        template.program,
        ctx.name,
        files.len()
    );

    let mut command = Command::new(&program);
    command.args(&args).current_dir(ctx.root);

    let outcome = match process::run_supervised(command, None, ctx.timeout, ctx.cancel) {
        Ok(outcome) => outcome,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing()),
        Err(e) => {
            return Err(CheckFailure::execution(format!(
                "failed to start {}: {e}",
                template.program
            )));
        }
    };

    match outcome {
        ProcessOutcome::Exited { status, output } => {
            let combined = output.combined();
            if !status.success() {
                let message = match status.code() {
                    Some(code) => format!("{} exited with status {code}", template.program),
                    None => format!("{} was terminated by a signal", template.program),
                };
                return Err(CheckFailure::Execution {
                    message,
                    output: combined,
                    suggestion: template.fix_hint.clone(),
                });
            }
            if template.fail_on_output && !output.stdout.iter().all(u8::is_ascii_whitespace) {
                return Err(CheckFailure::Execution {
                    message: format!("{} reported issues", template.program),
                    output: combined,
                    suggestion: template.fix_hint.clone(),
                });
            }
            Ok(CheckOutput {
                output: combined,
                modified: Vec::new(),
            })
        }
        ProcessOutcome::TimedOut { elapsed, output } => Err(CheckFailure::Timeout {
            subject: format!("check '{}'", ctx.name),
            timeout: ctx.timeout,
            elapsed,
            output: output.combined(),
        }),
        ProcessOutcome::Cancelled { output } => Err(CheckFailure::Cancelled {
            output: output.combined(),
        }),
    }
}
