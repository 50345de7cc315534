//! Command registry: stores command specs by name and hands them to the dispatcher.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use super::{
    binder::ParsedArguments,
    context::ApplicationContext,
    error::{MachError, MachResult},
    spec::CommandSpec,
};

/// Failure reported by a command handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Structured exit: the status is propagated to the caller verbatim.
    #[error("exited with status {0}")]
    Exit(i32),

    /// Any other failure; the dispatcher wraps it as a command execution error.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Handler trait that every command implements.
///
/// Handlers receive the shared application context and the arguments bound
/// for this invocation only.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &ApplicationContext, args: &ParsedArguments) -> HandlerResult;
}

/// Adapter turning a plain function into a [`CommandHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&ApplicationContext, &ParsedArguments) -> HandlerResult + Send + Sync,
{
    async fn handle(&self, ctx: &ApplicationContext, args: &ParsedArguments) -> HandlerResult {
        (self.0)(ctx, args)
    }
}

/// Wrap a synchronous function as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(&ApplicationContext, &ParsedArguments) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Registry of command specs, keyed by unique name.
///
/// Writable during the load phase; [`freeze`](Self::freeze) makes it read-only.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    /// Specs in registration order.
    specs: Vec<CommandSpec>,
    /// Map of command name to position in `specs`.
    index: HashMap<String, usize>,
    frozen: bool,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command spec.
    ///
    /// Fails with `RegistryFrozen` after [`freeze`](Self::freeze) and with
    /// `DuplicateCommand` if the name is taken; the registry is unchanged on failure.
    pub fn register(&mut self, spec: CommandSpec) -> MachResult<()> {
        self.check_available(spec.name())?;
        tracing::debug!(command = spec.name(), "registering command");
        self.index.insert(spec.name().to_string(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Check that `name` could be registered right now.
    pub fn check_available(&self, name: &str) -> MachResult<()> {
        if self.frozen {
            return Err(MachError::RegistryFrozen(name.to_string()));
        }
        if self.index.contains_key(name) {
            return Err(MachError::DuplicateCommand(name.to_string()));
        }
        Ok(())
    }

    /// Get a spec by name.
    pub fn lookup(&self, name: &str) -> MachResult<&CommandSpec> {
        self.index
            .get(name)
            .map(|&pos| &self.specs[pos])
            .ok_or_else(|| MachError::UnknownCommand(name.to_string()))
    }

    /// All registered specs in registration order.
    ///
    /// Each call starts a fresh iteration.
    pub fn list(&self) -> impl Iterator<Item = &CommandSpec> + '_ {
        self.specs.iter()
    }

    /// Lock the registry against further registration. Idempotent.
    pub fn freeze(&mut self) {
        if !self.frozen {
            tracing::info!(commands = self.specs.len(), "command registry frozen");
            self.frozen = true;
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
