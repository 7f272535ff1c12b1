use super::{load_config, project_root};
use crate::cli::{CommandContext, Output};
use crate::plugins::{DEFAULT_PLUGIN_TIMEOUT, ManifestError, Plugin};
use crate::shared::format_duration;
use anyhow::Result;
use clap::Subcommand;
use console::style;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum PluginCommands {
    /// List plugins found in the configured plugin directory
    List,
    /// Show the full manifest of one discovered plugin
    Info {
        /// Plugin name as declared in its manifest
        name: String,
    },
    /// Validate the manifest of one plugin directory
    Validate {
        /// Plugin directory containing plugin.yaml or plugin.json
        dir: PathBuf,
    },
}

pub fn execute(cmd: PluginCommands, ctx: &CommandContext) -> Result<()> {
    match cmd {
        PluginCommands::List => list(ctx),
        PluginCommands::Info { name } => info(&name, ctx),
        PluginCommands::Validate { dir } => validate(&ctx.root.join(dir), &ctx.output),
    }
}

fn list(ctx: &CommandContext) -> Result<()> {
    let (root, _) = project_root(ctx);
    let config = load_config(ctx, &root)?;
    let output = ctx.output;
    let loader = config.plugin_loader(&root)?;

    if !config.plugins.enabled {
        output.warning("Plugins are disabled (set plugins.enabled = true to run them)");
    }

    let discovery = loader.discover()?;
    if discovery.is_empty() {
        output.info(&format!("No plugins in {}", loader.root().display()));
        return Ok(());
    }

    output.header(&format!("Plugins in {}", loader.root().display()));
    for plugin in &discovery.plugins {
        describe(plugin, &output);
    }
    for problem in discovery.problems.iter().chain(&discovery.duplicates) {
        output.warning(problem);
    }

    Ok(())
}

fn info(name: &str, ctx: &CommandContext) -> Result<()> {
    let (root, _) = project_root(ctx);
    let config = load_config(ctx, &root)?;
    let output = ctx.output;
    let loader = config.plugin_loader(&root)?;
    let discovery = loader.discover()?;

    let Some(plugin) = discovery.get(name) else {
        anyhow::bail!("plugin '{}' not found in {}", name, loader.root().display());
    };

    describe(plugin, &output);
    if output.is_quiet() {
        return Ok(());
    }
    let manifest = &plugin.manifest;
    if !manifest.author.is_empty() {
        output.indent(&format!("author:   {}", manifest.author));
    }
    output.indent(&format!("path:     {}", plugin.dir.display()));
    let mut command = vec![plugin.executable_path().display().to_string()];
    command.extend(manifest.args.iter().cloned());
    output.indent(&format!("command:  {}", command.join(" ")));
    output.indent(&format!("needs files: {}", manifest.requires_files));
    if !manifest.environment.is_empty() {
        let keys: Vec<&str> = manifest.environment.keys().map(String::as_str).collect();
        output.indent(&format!("env:      {}", keys.join(", ")));
    }
    Ok(())
}

fn validate(dir: &std::path::Path, output: &Output) -> Result<()> {
    match Plugin::load(dir, DEFAULT_PLUGIN_TIMEOUT) {
        Ok(plugin) => {
            output.success(&format!("Plugin '{}' is valid", plugin.name()));
            describe(&plugin, output);
            if !plugin.executable_path().exists() {
                output.warning(&format!(
                    "Executable {} does not exist yet",
                    plugin.executable_path().display()
                ));
            }
            Ok(())
        }
        Err(ManifestError::Invalid { path, problems }) => {
            output.error(&format!("{} is invalid:", path.display()));
            for problem in &problems {
                eprintln!("  • {problem}");
            }
            anyhow::bail!("plugin validation failed with {} problem(s)", problems.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn describe(plugin: &Plugin, output: &Output) {
    let manifest = &plugin.manifest;
    if output.is_quiet() {
        return;
    }
    println!(
        "  {} {}",
        style(&manifest.name).bold(),
        style(format!("v{}", manifest.version)).dim()
    );
    output.indent(&manifest.description);
    if !manifest.category.is_empty() {
        output.indent(&format!("category: {}", manifest.category));
    }
    output.indent(&format!("files:    {}", manifest.file_patterns.join(", ")));
    output.indent(&format!("timeout:  {}", format_duration(plugin.timeout)));
    if !manifest.dependencies.is_empty() {
        output.indent(&format!("requires: {}", manifest.dependencies.join(", ")));
    }
}
