//! Implements `environment` to show the tree root, configuration and loaded modules.

use std::io::Write;

use anyhow::Context;
use serde_json::json;

use crate::internal::{
    binder::ParsedArguments,
    context::ApplicationContext,
    registry::{HandlerResult, handler_fn},
    spec::{ArgumentDef, CommandSpec, SpecError},
};

pub const NAME: &str = "environment";

pub fn spec() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder(NAME, handler_fn(execute))
        .category("misc")
        .description("Show info about the mach and tree environment")
        .argument(
            ArgumentDef::choice("format", ["text", "json"])
                .with_default("text")
                .with_help("Output format"),
        )
        .build()
}

fn execute(ctx: &ApplicationContext, args: &ParsedArguments) -> HandlerResult {
    let text = render(ctx, args.get_str("format") == Some("json"))?;
    std::io::stdout()
        .lock()
        .write_all(text.as_bytes())
        .context("failed to write environment")?;
    Ok(())
}

pub fn render(ctx: &ApplicationContext, json: bool) -> anyhow::Result<String> {
    let config_path = ctx.config_path();
    let modules = &ctx.config().modules;

    if json {
        let value = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "root": ctx.root(),
            "config": config_path,
            "config_exists": config_path.exists(),
            "modules": modules,
            "commands": ctx.commands().len(),
        });
        let mut out = serde_json::to_string_pretty(&value)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = format!("mach {}\n", env!("CARGO_PKG_VERSION"));
    out.push_str(&format!("root: {}\n", ctx.root().display()));
    let state = if config_path.exists() { "" } else { " (not present)" };
    out.push_str(&format!("config: {}{state}\n", config_path.display()));
    out.push_str(&format!("commands: {}\n", ctx.commands().len()));
    if modules.is_empty() {
        out.push_str("modules: none\n");
    } else {
        out.push_str("modules:\n");
        for module in modules {
            out.push_str(&format!("  {module}\n"));
        }
    }
    Ok(out)
}
