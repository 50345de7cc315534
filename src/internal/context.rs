//! Shared application context handed to every command handler.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use serde::Serialize;

use super::config::{MachConfig, config_path};

/// Name, description and category of a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSummary {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Process-wide state created once with the dispatcher.
///
/// Read-only for handlers. The command index is filled in once, when the
/// registry is frozen.
#[derive(Debug)]
pub struct ApplicationContext {
    root: PathBuf,
    config: Arc<MachConfig>,
    commands: OnceLock<Vec<CommandSummary>>,
}

impl ApplicationContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, MachConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: MachConfig) -> Self {
        Self {
            root: root.into(),
            config: Arc::new(config),
            commands: OnceLock::new(),
        }
    }

    /// Source-tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &MachConfig {
        &self.config
    }

    /// Location of the tree configuration file (which may not exist).
    pub fn config_path(&self) -> PathBuf {
        config_path(&self.root)
    }

    /// Registered commands, available once the registry is frozen.
    pub fn commands(&self) -> &[CommandSummary] {
        self.commands.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn publish_commands(&self, commands: Vec<CommandSummary>) {
        if self.commands.set(commands).is_err() {
            tracing::debug!("command index already published");
        }
    }
}
