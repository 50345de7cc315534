//! Source-tree root discovery.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::internal::config::CONFIG_FILE;

/// Environment variable naming the tree root explicitly.
pub const ROOT_ENV: &str = "MACH_ROOT";

/// First directory from `start` upwards that contains `mach.toml`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Resolve the tree root: an explicit path wins, then `env_root`, then the
/// nearest ancestor of `cwd` holding `mach.toml`, then `cwd` itself.
///
/// The result is canonicalized, so it must exist.
pub fn resolve_root(
    explicit: Option<&Path>,
    env_root: Option<&Path>,
    cwd: &Path,
) -> anyhow::Result<PathBuf> {
    let root = explicit
        .or(env_root)
        .map(|dir| cwd.join(dir))
        .or_else(|| find_root(cwd))
        .unwrap_or_else(|| cwd.to_path_buf());
    root.canonicalize()
        .with_context(|| format!("invalid source-tree root {}", root.display()))
}
