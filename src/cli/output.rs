//! Terminal output for gatekeep
//!
//! Styled status lines in the spirit of lint-staged: one line per check as it
//! finishes, failure details afterwards, then a summary.

use crate::engine::{CheckResult, CheckStatus, ProgressEvent, RunReport};
use crate::shared::format_duration;
use console::style;

/// Output handler for consistent CLI formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Errors are shown even in quiet mode.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✖").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn key_value(&self, key: &str, value: &str, highlight: bool) {
        if !self.quiet {
            let styled_value = if highlight {
                style(value).green().bold()
            } else {
                style(value).white()
            };
            println!("  {:<14} {}", style(key).dim(), styled_value);
        }
    }

    pub fn indent(&self, message: &str) {
        if !self.quiet {
            println!("    {message}");
        }
    }

    pub fn blank_line(&self) {
        if !self.quiet {
            println!();
        }
    }

    /// One line per progress event. `Running` lines only show with `-v`.
    pub fn progress(&self, event: &ProgressEvent) {
        if self.quiet {
            return;
        }
        let counter = style(format!("[{}/{}]", event.index + 1, event.total)).dim();
        match event.status {
            CheckStatus::Running => {
                if self.verbose {
                    println!("{} {} {}", counter, style("❯").cyan(), event.name);
                }
            }
            CheckStatus::Passed => println!(
                "{} {} {} {}",
                counter,
                style("✔").green(),
                event.name,
                style(format_duration(event.duration)).dim()
            ),
            CheckStatus::Failed => println!(
                "{} {} {} {}",
                counter,
                style("✖").red(),
                style(&event.name).red(),
                style(format_duration(event.duration)).dim()
            ),
            CheckStatus::Skipped => println!(
                "{} {} {} {}",
                counter,
                style("↓").yellow(),
                event.name,
                style("skipped").dim()
            ),
        }
    }

    /// Failure details, then skipped-check notes, then the summary line.
    pub fn report(&self, report: &RunReport) {
        for result in report.failures() {
            self.failure_detail(result);
        }

        if !self.quiet {
            let degraded: Vec<&CheckResult> = report
                .results
                .iter()
                .filter(|r| r.gracefully_skipped && r.error.is_some())
                .collect();
            if !degraded.is_empty() {
                println!();
                for result in degraded {
                    self.warning(&format!(
                        "{} skipped: {}",
                        result.name,
                        result.error.as_deref().unwrap_or_default()
                    ));
                    if let Some(suggestion) = &result.suggestion {
                        self.indent(&style(suggestion).dim().to_string());
                    }
                }
            }
        }

        self.summary(report);
    }

    fn failure_detail(&self, result: &CheckResult) {
        eprintln!();
        eprintln!(
            "{} {}",
            style("✖").red().bold(),
            style(format!("{} failed", result.name)).red().bold()
        );
        if let Some(command) = &result.command {
            eprintln!("  {} {}", style("command:").dim(), command);
        }
        if let Some(error) = &result.error {
            eprintln!("  {} {}", style("error:").dim(), error);
        }
        if !result.output.trim().is_empty() {
            for line in result.output.trim_end().lines() {
                eprintln!("    {line}");
            }
        }
        if let Some(suggestion) = &result.suggestion {
            eprintln!("  {} {}", style("hint:").cyan(), suggestion);
        }
    }

    fn summary(&self, report: &RunReport) {
        let line = format!(
            "{} passed, {} failed, {} skipped in {} ({} file{})",
            report.passed,
            report.failed,
            report.skipped,
            format_duration(report.total_duration),
            report.total_files,
            if report.total_files == 1 { "" } else { "s" }
        );
        if report.is_success() {
            if !self.quiet {
                println!();
            }
            self.success(&line);
        } else {
            eprintln!();
            self.error(&line);
        }
    }
}
