//! Error taxonomy for command registration, argument binding and dispatch.

use std::path::PathBuf;

use colored::Colorize;
use thiserror::Error;

use super::spec::ArgKind;

/// Exit status for a command that completed successfully.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status for a handler fault, and for a failed load phase.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for dispatch-level errors (unknown command, bad arguments).
pub const EXIT_USAGE: i32 = 2;

/// Errors raised by the registry, the argument binder, the module loader and
/// the dispatcher.
#[derive(Debug, Error)]
pub enum MachError {
    /// A command with this name is already registered.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),

    /// No command with this name is registered.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Registration was attempted after the registry was frozen.
    #[error("registry is frozen, cannot register command: {0}")]
    RegistryFrozen(String),

    /// A required argument was neither passed as a flag nor positionally.
    #[error("missing required argument: --{0}")]
    MissingRequiredArgument(String),

    /// A `--flag` token matched no declared argument.
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    /// A raw value could not be converted to the argument's kind.
    #[error("invalid value '{value}' for --{name}: expected {expected}")]
    InvalidValue {
        name: String,
        value: String,
        expected: ArgKind,
    },

    /// A raw value is not one of the argument's declared choices.
    #[error("invalid choice '{value}' for --{name}: expected one of [{}]", allowed.join(", "))]
    InvalidChoice {
        name: String,
        value: String,
        allowed: Vec<String>,
    },

    /// A declaration source could not be read, parsed or registered.
    #[error("failed to load commands from {}: {cause}", path.display())]
    ModuleLoad { path: PathBuf, cause: String },

    /// The command's handler failed.
    #[error("{command}: command failed: {source:#}")]
    CommandExecution {
        command: String,
        #[source]
        source: anyhow::Error,
    },
}

impl MachError {
    /// Build a [`MachError::ModuleLoad`] from any displayable cause.
    pub fn module_load(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::ModuleLoad {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCommand(_) => "duplicate_command",
            Self::UnknownCommand(_) => "unknown_command",
            Self::RegistryFrozen(_) => "registry_frozen",
            Self::MissingRequiredArgument(_) => "missing_required_argument",
            Self::UnknownFlag(_) => "unknown_flag",
            Self::InvalidValue { .. } => "invalid_value",
            Self::InvalidChoice { .. } => "invalid_choice",
            Self::ModuleLoad { .. } => "module_load",
            Self::CommandExecution { .. } => "command_execution",
        }
    }

    /// Process exit status this error maps to.
    pub fn exit_code(&self) -> i32 {
        if self.is_dispatch_error() {
            EXIT_USAGE
        } else {
            EXIT_FAILURE
        }
    }

    /// `true` for errors the dispatcher recovers from at run time: unknown
    /// commands and argument binding failures.
    pub fn is_dispatch_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommand(_)
                | Self::MissingRequiredArgument(_)
                | Self::UnknownFlag(_)
                | Self::InvalidValue { .. }
                | Self::InvalidChoice { .. }
        )
    }

    /// Message used after the `error: <command>: ` prefix on the error stream.
    ///
    /// The command name is already part of the prefix, so it is left out here.
    pub fn summary(&self) -> String {
        match self {
            Self::UnknownCommand(_) => "unknown command".to_string(),
            Self::CommandExecution { source, .. } => format!("command failed: {source:#}"),
            other => other.to_string(),
        }
    }
}

/// Result type for registry, binder, loader and dispatcher operations.
pub type MachResult<T> = Result<T, MachError>;

/// The `error:` prefix of every failure line, bold red when `color` is set.
pub fn error_prefix(color: bool) -> String {
    if color {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

/// The single `error: <command>: <summary>` line reported for `e`, without newline.
pub fn error_line(command: &str, e: &MachError, color: bool) -> String {
    format!("{} {command}: {}", error_prefix(color), e.summary())
}
