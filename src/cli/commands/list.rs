use super::{load_config, project_root};
use crate::cli::CommandContext;
use anyhow::Result;
use console::style;

pub fn execute(ctx: &CommandContext) -> Result<()> {
    let (root, _) = project_root(ctx);
    let config = load_config(ctx, &root)?;
    let registry = config.build_registry(&root)?;
    let output = ctx.output;

    if registry.is_empty() {
        output.info("No checks configured");
        return Ok(());
    }

    output.header("Checks");
    for check in registry.iter() {
        let state = if check.enabled {
            style("enabled").green()
        } else {
            style("disabled").dim()
        };
        let patterns = if check.file_patterns.is_empty() {
            "all files".to_string()
        } else {
            check.file_patterns.join(", ")
        };
        println!(
            "  {:<16} {:<8} {:<8} {}",
            check.name,
            state,
            check.strategy.kind(),
            style(patterns).dim()
        );
        if !check.description.is_empty() {
            output.indent(&style(&check.description).dim().to_string());
        }
    }

    Ok(())
}
