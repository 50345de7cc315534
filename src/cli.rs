//! CLI entry for mach: resolves the tree root, loads built-in and declared
//! commands, then hands the command line to the dispatcher.
use std::{
    env,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
};

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use crate::{
    command::BuiltinCommands,
    internal::{
        config::MachConfig,
        context::ApplicationContext,
        dispatcher::Dispatcher,
        error::{EXIT_SUCCESS, MachError, error_line},
        spec::RESERVED_HELP,
    },
    utils::path::{ROOT_ENV, resolve_root},
};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "MACH_LOG";

// Everything after the command name is forwarded untouched; the dispatcher
// binds it against the command's own schema.
#[derive(Parser, Debug)]
#[command(
    name = "mach",
    about = "Run the commands declared by a source tree",
    version
)]
struct Cli {
    #[arg(long, value_name = "DIR", help = "Source-tree root directory")]
    root: Option<PathBuf>,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v info, -vv debug)")]
    verbose: u8,

    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        help = "Command to run, followed by its arguments"
    )]
    argv: Vec<String>,
}

/// Install the global subscriber. `MACH_LOG` overrides the verbosity flag.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build a ready dispatcher for the tree at `root`.
///
/// Built-ins are registered first, then every module listed in `mach.toml`
/// in the order the patterns expand. The first load error aborts startup.
pub fn bootstrap(root: &Path) -> anyhow::Result<Dispatcher> {
    let config = MachConfig::load(root)?;
    let modules = config.module_paths(root)?;
    let mut dispatcher = Dispatcher::new(ApplicationContext::with_config(root, config));

    let mut loader = dispatcher.loader();
    loader.load_source(&BuiltinCommands::new())?;
    for path in &modules {
        loader.load_from(path)?;
    }

    let registry = dispatcher.registry();
    for command in dispatcher.context().config().defaults.keys() {
        if !registry.contains(command) {
            tracing::warn!(command = %command, "ignoring defaults for unknown command");
        }
    }

    dispatcher.freeze();
    Ok(dispatcher)
}

/// Parse the command line and run the requested command, returning the exit status.
/// - Caution: This is a `synchronous` function, it's declared as `async` to be able to use `[tokio::main]`
/// - `args`: parse from command line if it's `None`, otherwise parse from the given args
#[tokio::main(flavor = "current_thread")]
pub async fn parse(args: Option<&[&str]>) -> anyhow::Result<i32> {
    parse_async(args).await
}

/// `async` version of the [parse] function
pub async fn parse_async(args: Option<&[&str]>) -> anyhow::Result<i32> {
    let cli = match args {
        Some(args) => Cli::try_parse_from(args)?,
        None => Cli::parse(),
    };
    init_tracing(cli.verbose);

    let cwd = env::current_dir()?;
    let env_root = env::var_os(ROOT_ENV).map(PathBuf::from);
    let root = resolve_root(cli.root.as_deref(), env_root.as_deref(), &cwd)?;
    tracing::debug!(root = %root.display(), "resolved source-tree root");

    let dispatcher = bootstrap(&root)?;
    let code = run(&dispatcher, &cli.argv).await;
    dispatcher.shutdown();
    Ok(code)
}

async fn run(dispatcher: &Dispatcher, argv: &[String]) -> i32 {
    let Some((name, rest)) = argv.split_first() else {
        return print_help(dispatcher.general_help());
    };
    if name != RESERVED_HELP {
        return dispatcher.run(name, rest).await;
    }
    match rest.first() {
        None => print_help(dispatcher.general_help()),
        Some(target) => match dispatcher.command_help(target) {
            Ok(text) => print_help(text),
            Err(e) => {
                let color = std::io::stderr().is_terminal();
                report_help_error(target, &e, &mut std::io::stderr().lock(), color)
            }
        },
    }
}

fn print_help(text: String) -> i32 {
    if let Err(e) = std::io::stdout().lock().write_all(text.as_bytes()) {
        tracing::debug!(error = %e, "failed to write help text");
    }
    EXIT_SUCCESS
}

fn report_help_error(name: &str, e: &MachError, err: &mut dyn Write, color: bool) -> i32 {
    if let Err(write_err) = writeln!(err, "{}", error_line(name, e, color)) {
        tracing::debug!(error = %write_err, "failed to write error line");
    }
    e.exit_code()
}

/// this test is to verify that the CLI can be built without panicking
/// according [clap dock](https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_4/index.html)
#[test]
fn verify_cli() {
    use clap::CommandFactory;

    Cli::command().debug_assert()
}
