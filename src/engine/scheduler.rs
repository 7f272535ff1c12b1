//! Worker pool that runs the selected checks
//!
//! Checks are queued in selection order on a crossbeam channel and pulled by
//! a fixed set of scoped worker threads. Each worker owns one check at a time
//! from dequeue to result. Results land in index-addressed slots; progress
//! events travel over a second channel and are delivered on the calling
//! thread, which is the only place the callback runs.
//!
//! Two cancellation tokens are in play. The run token (from the caller) kills
//! in-flight processes. The dispatch token is its child: fail-fast cancels
//! only this one, so running checks finish but nothing new is dequeued.

use super::builtin;
use super::check::{Check, ExecContext, ExecutionStrategy};
use super::error::{CheckFailure, EngineError};
use super::progress::{CheckStatus, ProgressCallback, ProgressEvent};
use super::report::{CheckResult, Outcome, ResultSlots, RunReport};
use crate::plugins::adapter;
use crate::shared::format_duration;
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Knobs that apply to every check in a run.
pub struct RunPolicy<'a> {
    pub root: &'a Path,
    pub parallelism: usize,
    pub fail_fast: bool,
    pub graceful_degradation: bool,
    pub debug_timeout_detail: bool,
    pub timeout_override: Option<Duration>,
    pub cancel: &'a CancellationToken,
}

/// Pool size: `parallelism` when set, otherwise one worker per CPU, never
/// more workers than checks and never fewer than one.
pub fn pool_size(parallelism: usize, checks: usize) -> usize {
    let pool = if parallelism > 0 {
        parallelism
    } else {
        num_cpus::get()
    };
    pool.min(checks).max(1)
}

/// Shared, read-only state handed to every worker.
struct WorkerContext<'s, 'c> {
    worker_id: usize,
    work_rx: Receiver<(usize, &'c Check)>,
    event_tx: Sender<ProgressEvent>,
    slots: &'s ResultSlots,
    files: &'s [String],
    policy: &'s RunPolicy<'s>,
    dispatch: &'s CancellationToken,
    total: usize,
}

pub fn run(
    selected: &[&Check],
    files: &[String],
    policy: &RunPolicy<'_>,
    mut progress: Option<ProgressCallback>,
) -> Result<RunReport, EngineError> {
    let started = Instant::now();
    let total = selected.len();
    let workers = pool_size(policy.parallelism, total);
    let slots = ResultSlots::new(total);
    let dispatch = policy.cancel.child_token();

    tracing::debug!("Running {} check(s) on {} worker(s)", total, workers);

    let (work_tx, work_rx) = unbounded();
    for item in selected.iter().copied().enumerate() {
        // The receiver is alive until the scope below ends
        let _ = work_tx.send(item);
    }
    drop(work_tx);

    let (event_tx, event_rx) = unbounded::<ProgressEvent>();

    crossbeam::thread::scope(|s| {
        for worker_id in 0..workers {
            let ctx = WorkerContext {
                worker_id,
                work_rx: work_rx.clone(),
                event_tx: event_tx.clone(),
                slots: &slots,
                files,
                policy,
                dispatch: &dispatch,
                total,
            };
            s.spawn(move |_| worker_thread(ctx));
        }
        drop(event_tx);

        // Ends once every worker has exited and dropped its sender
        for event in event_rx.iter() {
            if let Some(callback) = progress.as_mut() {
                callback(&event);
            }
        }
    })
    .map_err(|_| EngineError::WorkerPanic)?;

    // Anything left unfilled was never dispatched
    for (index, check) in selected.iter().enumerate() {
        if !slots.is_filled(index) {
            tracing::debug!("Check '{}' was not run", check.name);
            if let Some(callback) = progress.as_mut() {
                callback(&ProgressEvent {
                    name: check.name.clone(),
                    status: CheckStatus::Skipped,
                    duration: Duration::ZERO,
                    index,
                    total,
                });
            }
        }
    }

    let names: Vec<&str> = selected.iter().map(|c| c.name.as_str()).collect();
    let results = slots.into_results(&names);
    Ok(RunReport::new(results, started.elapsed(), files.len()))
}

fn worker_thread(ctx: WorkerContext<'_, '_>) {
    loop {
        if ctx.dispatch.is_cancelled() {
            break;
        }
        let Ok((index, check)) = ctx.work_rx.recv() else {
            break;
        };
        // Cancellation may have landed while this worker was waiting
        if ctx.dispatch.is_cancelled() {
            break;
        }

        tracing::trace!("Worker {} picked up '{}'", ctx.worker_id, check.name);
        let _ = ctx.event_tx.send(ProgressEvent {
            name: check.name.clone(),
            status: CheckStatus::Running,
            duration: Duration::ZERO,
            index,
            total: ctx.total,
        });

        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| {
            execute_check(check, ctx.files, ctx.policy)
        }))
        .unwrap_or_else(|_| {
            tracing::error!("Check '{}' panicked", check.name);
            CheckResult::failed(
                &check.name,
                started.elapsed(),
                Vec::new(),
                "check panicked during execution".to_string(),
            )
        });

        let outcome = result.outcome();
        if outcome == Outcome::Failed && ctx.policy.fail_fast && !ctx.dispatch.is_cancelled() {
            tracing::info!("Check '{}' failed, stopping dispatch (fail-fast)", check.name);
            ctx.dispatch.cancel();
        }

        let _ = ctx.event_tx.send(ProgressEvent {
            name: check.name.clone(),
            status: outcome.into(),
            duration: result.duration,
            index,
            total: ctx.total,
        });
        ctx.slots.fill(index, result);
    }
}

/// Run one check to a result. Never fails: every problem becomes part of the result.
fn execute_check(check: &Check, files: &[String], policy: &RunPolicy<'_>) -> CheckResult {
    let started = Instant::now();
    let files = check.matching_files(files);

    if check.requires_files && files.is_empty() {
        tracing::debug!("No matching files for '{}', skipping", check.name);
        return CheckResult::gracefully_skipped(&check.name, started.elapsed(), files);
    }

    let timeout = policy.timeout_override.unwrap_or(check.timeout);
    if policy.debug_timeout_detail {
        tracing::info!(
            "Starting check '{}' with timeout {}",
            check.name,
            format_duration(timeout)
        );
    }

    let ctx = ExecContext {
        name: &check.name,
        root: policy.root,
        timeout,
        cancel: policy.cancel,
    };

    let outcome = match &check.strategy {
        ExecutionStrategy::BuiltIn(template) => builtin::execute(template, &files, &ctx),
        ExecutionStrategy::Plugin(plugin) => adapter::execute(plugin, &files, &ctx),
    };

    let duration = started.elapsed();
    let command = Some(check.strategy.command_line());

    match outcome {
        Ok(output) => CheckResult {
            output: output.output,
            modified: output.modified,
            command,
            ..CheckResult::passed(&check.name, duration, files)
        },
        Err(failure) => {
            tracing::debug!("Check '{}' did not pass: {}", check.name, failure);
            CheckResult {
                command,
                ..failure_result(check, failure, duration, files, policy)
            }
        }
    }
}

fn failure_result(
    check: &Check,
    failure: CheckFailure,
    duration: Duration,
    files: Vec<String>,
    policy: &RunPolicy<'_>,
) -> CheckResult {
    let suggestion = failure.suggestion();

    if policy.graceful_degradation && failure.is_degradable() {
        tracing::warn!("Skipping '{}': {}", check.name, failure);
        return CheckResult {
            error: Some(failure.to_string()),
            suggestion,
            ..CheckResult::gracefully_skipped(&check.name, duration, files)
        };
    }

    let mut error = failure.to_string();
    let output = match &failure {
        CheckFailure::Timeout {
            elapsed, output, ..
        } => {
            if policy.debug_timeout_detail {
                error = format!("{error} (elapsed {})", format_duration(*elapsed));
            }
            // Built-in tools only expose partial output on request
            if check.is_plugin() || policy.debug_timeout_detail {
                output.clone()
            } else {
                String::new()
            }
        }
        other => other.output().to_string(),
    };

    CheckResult {
        output,
        suggestion,
        ..CheckResult::failed(&check.name, duration, files, error)
    }
}

#[cfg(all(test, unix))]
mod tests;
