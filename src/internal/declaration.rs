//! TOML declaration files: the on-disk format for commands provided by the tree.
//!
//! ```toml
//! [[command]]
//! name = "build"
//! description = "Build the tree"
//! category = "build"
//! run = "make -C {root} {target} -j{jobs} {args}"
//!
//! [[command.argument]]
//! name = "target"
//! kind = "string"
//! required = true
//!
//! [[command.argument]]
//! name = "jobs"
//! kind = "integer"
//! default = 4
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, bail};
use serde::Deserialize;
use tokio::time::Duration;

use super::{
    handlers::shell::{ARGS_PLACEHOLDER, CommandTemplate, ROOT_PLACEHOLDER, ShellHandler},
    loader::CommandSource,
    spec::{ArgKind, ArgumentDef, CommandSpec},
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarationDoc {
    #[serde(default)]
    command: Vec<CommandDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandDecl {
    name: String,
    #[serde(default)]
    description: String,
    category: Option<String>,
    run: String,
    cwd: Option<PathBuf>,
    timeout_secs: Option<u64>,
    #[serde(default)]
    argument: Vec<ArgumentDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArgumentDecl {
    name: String,
    kind: KindDecl,
    #[serde(default)]
    required: bool,
    default: Option<toml::Value>,
    #[serde(default)]
    choices: Vec<String>,
    #[serde(default)]
    help: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KindDecl {
    Flag,
    String,
    Integer,
    Choice,
}

/// Parse declaration file content into command specs.
pub fn parse_declarations(content: &str) -> anyhow::Result<Vec<CommandSpec>> {
    let doc: DeclarationDoc = toml::from_str(content)?;
    doc.command.into_iter().map(CommandDecl::into_spec).collect()
}

impl CommandDecl {
    fn into_spec(self) -> anyhow::Result<CommandSpec> {
        let name = self.name;
        let arguments = self
            .argument
            .into_iter()
            .map(ArgumentDecl::into_def)
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("command '{name}'"))?;

        let arg_names: Vec<&str> = arguments.iter().map(|arg| arg.name.as_str()).collect();
        if let Some(reserved) = arg_names
            .iter()
            .find(|arg| **arg == ROOT_PLACEHOLDER || **arg == ARGS_PLACEHOLDER)
        {
            bail!("command '{name}': argument name '{reserved}' is reserved");
        }
        let template = CommandTemplate::parse(&self.run, &arg_names)
            .with_context(|| format!("command '{name}'"))?;

        if let Some(cwd) = &self.cwd
            && cwd.is_absolute()
        {
            bail!("command '{name}': cwd must be relative to the root");
        }

        let mut handler = ShellHandler::new(template);
        if let Some(cwd) = self.cwd {
            handler = handler.with_cwd(cwd);
        }
        if let Some(secs) = self.timeout_secs {
            handler = handler.with_timeout(Duration::from_secs(secs));
        }

        let mut builder = CommandSpec::builder(name.as_str(), Arc::new(handler))
            .description(self.description);
        if let Some(category) = self.category {
            builder = builder.category(category);
        }
        for arg in arguments {
            builder = builder.argument(arg);
        }
        builder.build().with_context(|| format!("command '{name}'"))
    }
}

impl ArgumentDecl {
    fn into_def(self) -> anyhow::Result<ArgumentDef> {
        let kind = match (self.kind, self.choices.is_empty()) {
            (KindDecl::Choice, _) => ArgKind::Choice(self.choices),
            (_, false) => bail!("argument '{}': choices are only valid for kind 'choice'", self.name),
            (KindDecl::Flag, true) => ArgKind::Flag,
            (KindDecl::String, true) => ArgKind::String,
            (KindDecl::Integer, true) => ArgKind::Integer,
        };
        let mut def = ArgumentDef::new(self.name, kind).with_help(self.help);
        if self.required {
            def = def.required();
        }
        if let Some(default) = self.default {
            let raw = match default {
                toml::Value::String(s) => s,
                toml::Value::Integer(n) => n.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => bail!(
                    "argument '{}': unsupported default type '{}'",
                    def.name,
                    other.type_str()
                ),
            };
            let value = def
                .kind
                .parse_value(&def.name, &raw)
                .with_context(|| format!("argument '{}': invalid default", def.name))?;
            def = def.with_default(value);
        }
        Ok(def)
    }
}

/// A declaration file on disk.
#[derive(Debug, Clone)]
pub struct DeclarationFile {
    path: PathBuf,
}

impl DeclarationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CommandSource for DeclarationFile {
    fn origin(&self) -> &Path {
        &self.path
    }

    fn commands(&self) -> anyhow::Result<Vec<CommandSpec>> {
        let content = std::fs::read_to_string(&self.path).context("cannot read file")?;
        parse_declarations(&content)
    }
}
