//! Tree configuration read from `mach.toml` at the source-tree root.
//!
//! ```toml
//! modules = ["build/mach_commands.toml", "testing/*/mach_commands.toml"]
//!
//! [defaults.build]
//! jobs = 8
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// File name of the tree configuration.
pub const CONFIG_FILE: &str = "mach.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachConfig {
    /// Declaration files (or glob patterns) relative to the root, loaded in order.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Command-scoped defaults: command name -> argument name -> value.
    #[serde(default)]
    pub defaults: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl MachConfig {
    /// Read `mach.toml` under `root`; a missing file yields the default config.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no tree configuration, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults configured for `command`, as raw strings ready for argument parsing.
    pub fn defaults_for(&self, command: &str) -> anyhow::Result<Vec<(String, String)>> {
        let Some(table) = self.defaults.get(command) else {
            return Ok(Vec::new());
        };
        table
            .iter()
            .map(|(arg, value)| {
                raw_value(value)
                    .map(|raw| (arg.clone(), raw))
                    .with_context(|| format!("default for {command}.{arg}"))
            })
            .collect()
    }

    /// Resolve configured modules to file paths under `root`.
    ///
    /// Literal entries are returned as-is (a missing file is reported by the
    /// loader); glob patterns expand to their matches in sorted order.
    pub fn module_paths(&self, root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in &self.modules {
            let joined = root.join(entry);
            if !is_glob(entry) {
                paths.push(joined);
                continue;
            }
            // The root is matched literally even if it contains `[`, `*` or `?`.
            let escaped_root = PathBuf::from(glob::Pattern::escape(&root.to_string_lossy()));
            let pattern = escaped_root.join(entry);
            let pattern = pattern.to_string_lossy();
            let mut matches = glob::glob(&pattern)
                .with_context(|| format!("invalid module pattern '{entry}'"))?
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("failed to expand module pattern '{entry}'"))?;
            if matches.is_empty() {
                tracing::warn!(pattern = %entry, "module pattern matched no files");
            }
            matches.sort();
            paths.extend(matches);
        }
        Ok(paths)
    }
}

/// Path of the configuration file for `root`.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

fn raw_value(value: &toml::Value) -> anyhow::Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(n) => Ok(n.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => bail!("unsupported value type '{}'", other.type_str()),
    }
}
