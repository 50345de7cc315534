//! Implements `settings` to print the command-scoped defaults configured in `mach.toml`.

use std::io::{IsTerminal, Write};

use anyhow::{Context, bail};

use crate::internal::{
    binder::ParsedArguments,
    context::ApplicationContext,
    error::{EXIT_USAGE, error_prefix},
    registry::{HandlerError, HandlerResult, handler_fn},
    spec::{ArgumentDef, CommandSpec, SpecError},
};

pub const NAME: &str = "settings";

pub fn spec() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder(NAME, handler_fn(execute))
        .category("misc")
        .description("Show configured command defaults")
        .argument(ArgumentDef::string("command").with_help("Only show defaults for this command"))
        .build()
}

fn execute(ctx: &ApplicationContext, args: &ParsedArguments) -> HandlerResult {
    let color = std::io::stderr().is_terminal();
    show(
        ctx,
        args.get_str("command"),
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
        color,
    )
}

/// An unknown `--command` is a usage error: one error line and exit status 2.
fn show(
    ctx: &ApplicationContext,
    only: Option<&str>,
    out: &mut dyn Write,
    err: &mut dyn Write,
    color: bool,
) -> HandlerResult {
    if let Some(name) = only
        && !is_registered(ctx, name)
    {
        writeln!(err, "{} {NAME}: no such command: {name}", error_prefix(color))
            .context("failed to write error line")?;
        return Err(HandlerError::Exit(EXIT_USAGE));
    }
    let text = render(ctx, only)?;
    out.write_all(text.as_bytes())
        .context("failed to write settings")?;
    Ok(())
}

fn is_registered(ctx: &ApplicationContext, name: &str) -> bool {
    ctx.commands().iter().any(|command| command.name == name)
}

/// `command.argument = value` lines, sorted by command then argument.
pub fn render(ctx: &ApplicationContext, only: Option<&str>) -> anyhow::Result<String> {
    if let Some(name) = only
        && !is_registered(ctx, name)
    {
        bail!("no such command: {name}");
    }

    let mut out = String::new();
    for (command, table) in &ctx.config().defaults {
        if only.is_some_and(|name| name != command) {
            continue;
        }
        for (arg, value) in table {
            out.push_str(&format!("{command}.{arg} = {value}\n"));
        }
    }
    Ok(out)
}
