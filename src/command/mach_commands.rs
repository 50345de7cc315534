//! Implements `mach-commands` to list every registered command, for shell completion.

use std::io::Write;

use anyhow::Context;

use crate::internal::{
    binder::ParsedArguments,
    context::{ApplicationContext, CommandSummary},
    registry::{HandlerResult, handler_fn},
    spec::{ArgumentDef, CommandSpec, SpecError},
};

pub const NAME: &str = "mach-commands";

pub fn spec() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder(NAME, handler_fn(execute))
        .category("misc")
        .description("List all mach commands")
        .argument(ArgumentDef::flag("json").with_help("Print name, description and category as JSON"))
        .build()
}

fn execute(ctx: &ApplicationContext, args: &ParsedArguments) -> HandlerResult {
    let text = render(ctx.commands(), args.get_flag("json"))?;
    std::io::stdout()
        .lock()
        .write_all(text.as_bytes())
        .context("failed to write command list")?;
    Ok(())
}

/// One name per line, or a JSON array of summaries.
pub fn render(commands: &[CommandSummary], json: bool) -> anyhow::Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(commands)?;
        out.push('\n');
        return Ok(out);
    }
    Ok(commands
        .iter()
        .map(|command| format!("{}\n", command.name))
        .collect())
}
