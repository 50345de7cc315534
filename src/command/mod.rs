//! Built-in commands compiled into the binary.
//!
//! They are registered through the same [`CommandSource`] interface as the
//! tree's declaration files.

use std::path::{Path, PathBuf};

use crate::internal::{loader::CommandSource, spec::CommandSpec};

pub mod environment;
pub mod mach_commands;
pub mod settings;

/// Origin reported for built-in commands in load errors.
pub const BUILTIN_ORIGIN: &str = "<builtin>";

/// The compiled-in command set.
pub struct BuiltinCommands {
    origin: PathBuf,
}

impl BuiltinCommands {
    pub fn new() -> Self {
        Self {
            origin: PathBuf::from(BUILTIN_ORIGIN),
        }
    }
}

impl Default for BuiltinCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSource for BuiltinCommands {
    fn origin(&self) -> &Path {
        &self.origin
    }

    fn commands(&self) -> anyhow::Result<Vec<CommandSpec>> {
        Ok(vec![
            mach_commands::spec()?,
            environment::spec()?,
            settings::spec()?,
        ])
    }
}
