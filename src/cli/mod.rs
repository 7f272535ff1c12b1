//! Command-line interface for gatekeep
//!
//! clap derive structs plus one module per subcommand under [`commands`].

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod output;

pub use output::Output;

use commands::plugin::PluginCommands;
use commands::run::RunArgs;

/// gatekeep - parallel pre-commit checks with plugin support
#[derive(Parser)]
#[command(name = "gatekeep", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (replaces user and repository config files)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, value_name = "DIR", global = true)]
    pub directory: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured checks against staged files
    Run(RunArgs),
    /// List the configured checks
    List,
    /// Inspect external plugins
    #[command(subcommand)]
    Plugin(PluginCommands),
    /// Install the pre-commit hook into the current repository
    Install {
        /// Replace a hook not written by gatekeep
        #[arg(long)]
        force: bool,
    },
    /// Remove the pre-commit hook
    Uninstall,
    /// Show version information
    Version,
}

/// Where a command runs and how it reports.
pub struct CommandContext {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub output: Output,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        commands::setup_logging(self.verbose, self.quiet);

        let root = match &self.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let ctx = CommandContext {
            root,
            config_path: self.config.clone(),
            output: Output::new(self.verbose > 0, self.quiet),
        };

        match self.command {
            Some(Commands::Run(args)) => commands::run::execute(args, &ctx).await,
            Some(Commands::List) => commands::list::execute(&ctx),
            Some(Commands::Plugin(cmd)) => commands::plugin::execute(cmd, &ctx),
            Some(Commands::Install { force }) => commands::install::execute(force, &ctx),
            Some(Commands::Uninstall) => commands::uninstall::execute(&ctx),
            Some(Commands::Version) => commands::version::execute(&ctx.output),
            None => {
                let mut cmd = Cli::command();
                cmd.print_help()?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "gatekeep", "-vv", "run", "--only", "fmt,lint", "--skip", "lint", "-p", "2",
            "--fail-fast", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.only, vec!["fmt", "lint"]);
                assert_eq!(args.skip, vec!["lint"]);
                assert_eq!(args.parallel, Some(2));
                assert!(args.fail_fast);
                assert_eq!(args.format, commands::run::OutputFormat::Json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_single_check_argument() {
        let cli = Cli::try_parse_from(["gatekeep", "run", "fmt"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => assert_eq!(args.check.as_deref(), Some("fmt")),
            _ => panic!("expected run"),
        }
    }
}
