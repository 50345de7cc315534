//! Command dispatcher: routes `mach <command> [args...]` to the registered handler.
//!
//! The dispatcher owns the registry and the shared [`ApplicationContext`].
//! Its lifecycle is `Loading` (commands are registered, usually through the
//! [`ModuleLoader`]) followed by `Ready` once [`Dispatcher::freeze`] is
//! called. [`Dispatcher::shutdown`] consumes it.
//!
//! Every run resolves to an exit status: `0` on success, the handler's own
//! status on a structured exit, `2` for dispatch errors and `1` for handler
//! faults. Failures produce exactly one `error: <command>: ...` line.

use std::{
    any::Any,
    io::{IsTerminal, Write},
    panic::AssertUnwindSafe,
    sync::Arc,
};

use futures::FutureExt;

use super::{
    binder::{self, ParsedArguments},
    context::{ApplicationContext, CommandSummary},
    error::{EXIT_SUCCESS, MachError, MachResult, error_line},
    loader::ModuleLoader,
    registry::{CommandRegistry, HandlerError},
    spec::CommandSpec,
};

const HELP_FLAG: &str = "--help";
const END_OF_FLAGS: &str = "--";
const UNCATEGORIZED: &str = "other";

/// Lifecycle phase of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Commands may be registered.
    Loading,
    /// Registry frozen; lookups and runs only.
    Ready,
}

/// How a dispatched command finished without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The handler returned successfully.
    Completed,
    /// The handler asked for this exit status.
    Exited(i32),
    /// `--help` was requested; carries the command's help text.
    Help(String),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed | Self::Help(_) => EXIT_SUCCESS,
            Self::Exited(code) => *code,
        }
    }
}

/// Resolves command names and raw arguments into executed handlers.
#[derive(Debug)]
pub struct Dispatcher {
    context: Arc<ApplicationContext>,
    registry: CommandRegistry,
    phase: Phase,
}

impl Dispatcher {
    /// Create a dispatcher in the `Loading` phase.
    pub fn new(context: ApplicationContext) -> Self {
        Self {
            context: Arc::new(context),
            registry: CommandRegistry::new(),
            phase: Phase::Loading,
        }
    }

    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.context
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Register a single command spec.
    pub fn register(&mut self, spec: CommandSpec) -> MachResult<()> {
        self.registry.register(spec)
    }

    /// Loader bound to this dispatcher's registry and configuration.
    pub fn loader(&mut self) -> ModuleLoader<'_> {
        ModuleLoader::new(&mut self.registry, self.context.config())
    }

    /// Transition `Loading -> Ready`. Idempotent.
    ///
    /// Publishes the command index to the context so built-in commands can list it.
    pub fn freeze(&mut self) {
        if self.phase == Phase::Ready {
            return;
        }
        self.registry.freeze();
        let summaries = self
            .registry
            .list()
            .map(|spec| CommandSummary {
                name: spec.name().to_string(),
                description: spec.description().to_string(),
                category: spec.category().map(str::to_string),
            })
            .collect();
        self.context.publish_commands(summaries);
        self.phase = Phase::Ready;
    }

    /// Run `name` with `raw_args`, printing to the process's stdout/stderr.
    pub async fn run<S: AsRef<str>>(&self, name: &str, raw_args: &[S]) -> i32 {
        let result = self.execute(name, raw_args).await;
        let color = std::io::stderr().is_terminal();
        let mut out = std::io::stdout().lock();
        let mut err = std::io::stderr().lock();
        self.report(name, result, &mut out, &mut err, color)
    }

    /// Run `name` with `raw_args`, writing help text to `out` and the error line to `err`.
    pub async fn run_with<S: AsRef<str>>(
        &self,
        name: &str,
        raw_args: &[S],
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> i32 {
        let result = self.execute(name, raw_args).await;
        self.report(name, result, out, err, false)
    }

    /// Look up, bind and invoke without any output.
    ///
    /// Unknown commands and binding errors propagate unchanged; handler
    /// failures (including panics) are wrapped as `CommandExecution`.
    pub async fn execute<S: AsRef<str>>(&self, name: &str, raw_args: &[S]) -> MachResult<Outcome> {
        let spec = self.registry.lookup(name)?;
        if wants_help(raw_args) {
            return Ok(Outcome::Help(spec.help_text()));
        }

        let args = binder::bind(spec.arguments(), raw_args)?;
        tracing::debug!(command = name, arguments = args.len(), "dispatching command");
        self.invoke(spec, &args).await
    }

    async fn invoke(&self, spec: &CommandSpec, args: &ParsedArguments) -> MachResult<Outcome> {
        let handler = spec.handler().clone();
        let result = AssertUnwindSafe(handler.handle(&self.context, args))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => Ok(Outcome::Completed),
            Ok(Err(HandlerError::Exit(code))) => {
                tracing::debug!(command = spec.name(), code, "command requested exit status");
                Ok(Outcome::Exited(code))
            }
            Ok(Err(HandlerError::Failed(source))) => Err(MachError::CommandExecution {
                command: spec.name().to_string(),
                source,
            }),
            Err(payload) => Err(MachError::CommandExecution {
                command: spec.name().to_string(),
                source: anyhow::anyhow!("panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    fn report(
        &self,
        name: &str,
        result: MachResult<Outcome>,
        out: &mut dyn Write,
        err: &mut dyn Write,
        color: bool,
    ) -> i32 {
        match result {
            Ok(Outcome::Help(text)) => {
                if let Err(e) = out.write_all(text.as_bytes()) {
                    tracing::debug!(error = %e, "failed to write help text");
                }
                EXIT_SUCCESS
            }
            Ok(outcome) => outcome.exit_code(),
            Err(e) => {
                tracing::debug!(command = name, error_code = e.error_code(), "command failed");
                if let Err(write_err) = writeln!(err, "{}", error_line(name, &e, color)) {
                    tracing::debug!(error = %write_err, "failed to write error line");
                }
                e.exit_code()
            }
        }
    }

    /// Help for a single command, or `UnknownCommand`.
    pub fn command_help(&self, name: &str) -> MachResult<String> {
        Ok(self.registry.lookup(name)?.help_text())
    }

    /// Overview of every registered command, grouped by category.
    ///
    /// Categories appear in order of first registration; commands without a
    /// category are listed last.
    pub fn general_help(&self) -> String {
        let mut groups: Vec<(&str, Vec<&CommandSpec>)> = Vec::new();
        for spec in self.registry.list() {
            let category = spec.category().unwrap_or(UNCATEGORIZED);
            match groups.iter_mut().find(|(name, _)| *name == category) {
                Some((_, specs)) => specs.push(spec),
                None => groups.push((category, vec![spec])),
            }
        }
        if let Some(pos) = groups.iter().position(|(name, _)| *name == UNCATEGORIZED) {
            let other = groups.remove(pos);
            groups.push(other);
        }

        let width = self.registry.list().map(|spec| spec.name().len()).max().unwrap_or(0);
        let mut out = String::from("usage: mach [--root <DIR>] [-v] <command> [<args>]\n");
        for (category, specs) in groups {
            out.push_str(&format!("\n{category} commands:\n"));
            for spec in specs {
                let line = format!("  {:<width$}  {}", spec.name(), spec.description());
                out.push_str(line.trim_end());
                out.push('\n');
            }
        }
        out.push_str("\nRun 'mach <command> --help' for details on a command.\n");
        out
    }

    /// End the dispatcher's lifetime.
    pub fn shutdown(self) {
        tracing::debug!(commands = self.registry.len(), "dispatcher shut down");
    }
}

fn wants_help<S: AsRef<str>>(raw_args: &[S]) -> bool {
    raw_args
        .iter()
        .map(AsRef::<str>::as_ref)
        .take_while(|token| *token != END_OF_FLAGS)
        .any(|token| token == HELP_FLAG)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
