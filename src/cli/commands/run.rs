use super::{load_config, project_root};
use crate::cli::CommandContext;
use crate::engine::{Engine, ProgressCallback, ProgressEvent, RunOptions};
use crate::shared::{format_duration, parse_duration};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Environment variables holding extra checks to skip, first non-empty wins
const SKIP_ENV_VARS: [&str; 2] = ["SKIP", "GATEKEEP_SKIP"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Run only this check, even if it is disabled
    pub check: Option<String>,

    /// Run only these checks (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "CHECKS")]
    pub only: Vec<String>,

    /// Skip these checks (comma-separated, added to $SKIP)
    #[arg(long, value_delimiter = ',', value_name = "CHECKS")]
    pub skip: Vec<String>,

    /// Check these files instead of the staged ones
    #[arg(short, long, num_args = 1.., conflicts_with = "all_files")]
    pub files: Vec<String>,

    /// Check every tracked file
    #[arg(short, long)]
    pub all_files: bool,

    /// Number of parallel workers (0 = one per CPU)
    #[arg(short, long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Stop dispatching checks after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Skip checks whose tool is not installed instead of failing
    #[arg(long)]
    pub graceful: bool,

    /// Include partial output and elapsed time in timeout errors
    #[arg(long)]
    pub debug_timeout: bool,

    /// Timeout applied to every check, e.g. 45s or 2m
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub async fn execute(args: RunArgs, ctx: &CommandContext) -> Result<()> {
    let output = ctx.output;
    let (root, repo) = project_root(ctx);
    let config = load_config(ctx, &root)?;

    if !config.enabled {
        output.info("gatekeep is disabled in configuration, nothing to run");
        return Ok(());
    }

    let files = if !args.files.is_empty() {
        args.files.clone()
    } else {
        let repo = repo.context("Not inside a Git repository; pass files with --files")?;
        if args.all_files {
            repo.all_files()?
        } else {
            repo.staged_files()?
        }
    };
    tracing::debug!("{} candidate file(s) under {}", files.len(), root.display());

    if files.is_empty() && args.check.is_none() {
        output.info("No files to check");
        return Ok(());
    }

    let registry = config.build_registry(&root)?;
    let engine = Engine::new(registry)
        .with_root(&root)
        .with_exclude_patterns(&config.exclude_patterns)?;

    let mut skip = args.skip.clone();
    skip.extend(env_skip());

    let cancel = CancellationToken::new();
    let progress: Option<ProgressCallback> = match args.format {
        OutputFormat::Text => Some(Box::new(move |event: &ProgressEvent| output.progress(event))),
        OutputFormat::Json => None,
    };

    let options = RunOptions {
        files,
        check: args.check.clone(),
        only: args.only.clone(),
        skip,
        parallelism: args.parallel.unwrap_or(config.performance.parallel_workers),
        fail_fast: args.fail_fast || config.performance.fail_fast,
        graceful_degradation: args.graceful || config.performance.graceful_degradation,
        debug_timeout_detail: args.debug_timeout,
        timeout_override: args.timeout,
        cancel: cancel.clone(),
        progress,
    };

    let run_timeout = config.run_timeout()?;
    let watcher = tokio::spawn(cancel_on_interrupt(cancel.clone(), run_timeout));

    let outcome = tokio::task::spawn_blocking(move || engine.run(options)).await;
    watcher.abort();
    let report = outcome.context("Check runner stopped unexpectedly")??;

    match args.format {
        OutputFormat::Text => output.report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if cancel.is_cancelled() {
        output.error("Run was cancelled before all checks finished");
    }

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Cancel the run on Ctrl-C or once `run_timeout` has passed.
async fn cancel_on_interrupt(cancel: CancellationToken, run_timeout: Duration) {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if signal.is_ok() {
                tracing::warn!("Interrupted, stopping running checks");
                cancel.cancel();
            }
        }
        _ = tokio::time::sleep(run_timeout) => {
            tracing::warn!("Run exceeded {}, stopping running checks", format_duration(run_timeout));
            cancel.cancel();
        }
    }
}

fn env_skip() -> Vec<String> {
    SKIP_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .map(|value| split_list(&value))
        .unwrap_or_default()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
