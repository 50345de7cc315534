//! Module loader: the boundary that turns command declaration sources into
//! registered [`CommandSpec`]s.
//!
//! A [`CommandSource`] is anything that can produce command specs: the TOML
//! declaration files under the source tree ([`DeclarationFile`]) and the
//! built-in command set compiled into the binary. The loader applies
//! command-scoped defaults from the tree configuration and registers the
//! result. Loading one source is all-or-nothing: every spec is checked
//! before any is registered.

use std::{collections::HashSet, path::Path};

use super::{
    config::MachConfig,
    declaration::DeclarationFile,
    error::{MachError, MachResult},
    registry::CommandRegistry,
    spec::CommandSpec,
};

/// A source of command declarations.
pub trait CommandSource {
    /// Where the declarations come from; used in load errors.
    fn origin(&self) -> &Path;

    /// Produce every command declared by this source.
    fn commands(&self) -> anyhow::Result<Vec<CommandSpec>>;
}

/// Registers commands from [`CommandSource`]s into a registry.
pub struct ModuleLoader<'a> {
    registry: &'a mut CommandRegistry,
    config: &'a MachConfig,
}

impl<'a> ModuleLoader<'a> {
    pub fn new(registry: &'a mut CommandRegistry, config: &'a MachConfig) -> Self {
        Self { registry, config }
    }

    /// Load the declaration file at `path`.
    ///
    /// Returns the number of commands registered.
    pub fn load_from(&mut self, path: &Path) -> MachResult<usize> {
        self.load_source(&DeclarationFile::new(path))
    }

    /// Load every command produced by `source`.
    ///
    /// Read and parse problems, and sources declaring nothing, fail with
    /// `ModuleLoad`. Name collisions fail with `DuplicateCommand` and a frozen
    /// registry with `RegistryFrozen`; in every case the registry is unchanged.
    pub fn load_source(&mut self, source: &dyn CommandSource) -> MachResult<usize> {
        let origin = source.origin();
        let mut specs = source
            .commands()
            .map_err(|e| MachError::module_load(origin, format!("{e:#}")))?;
        if specs.is_empty() {
            return Err(MachError::module_load(origin, "no commands found"));
        }

        for spec in &mut specs {
            self.apply_defaults(origin, spec)?;
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name()) {
                return Err(MachError::DuplicateCommand(spec.name().to_string()));
            }
            self.registry.check_available(spec.name())?;
        }

        let count = specs.len();
        for spec in specs {
            self.registry.register(spec)?;
        }
        tracing::debug!(origin = %origin.display(), count, "loaded commands");
        Ok(count)
    }

    fn apply_defaults(&self, origin: &Path, spec: &mut CommandSpec) -> MachResult<()> {
        let defaults = self
            .config
            .defaults_for(spec.name())
            .map_err(|e| MachError::module_load(origin, format!("{e:#}")))?;
        for (arg, raw) in defaults {
            spec.override_default(&arg, &raw).map_err(|e| {
                MachError::module_load(
                    origin,
                    format!("configured default for {}.{arg}: {e:#}", spec.name()),
                )
            })?;
        }
        Ok(())
    }
}
