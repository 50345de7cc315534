//! Command metadata: argument schemas and the [`CommandSpec`] stored by the registry.

use std::{collections::HashSet, fmt, sync::Arc};

use thiserror::Error;

use super::{
    error::{MachError, MachResult},
    registry::CommandHandler,
};

/// Reserved for the dispatcher's own `help` command and `--help` flag.
pub const RESERVED_HELP: &str = "help";

/// Kind of value an argument accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// Boolean switch: present means `true`, takes no value.
    Flag,
    String,
    Integer,
    /// String restricted to the enumerated set.
    Choice(Vec<String>),
}

impl ArgKind {
    /// Whether a `--name` token of this kind consumes a value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::Flag)
    }

    /// Convert a raw token into a typed value for the argument `name`.
    pub fn parse_value(&self, name: &str, raw: &str) -> MachResult<ArgValue> {
        match self {
            Self::Flag => match raw {
                "true" => Ok(ArgValue::Bool(true)),
                "false" => Ok(ArgValue::Bool(false)),
                _ => Err(self.invalid(name, raw)),
            },
            Self::String => Ok(ArgValue::String(raw.to_string())),
            Self::Integer => raw
                .parse::<i64>()
                .map(ArgValue::Integer)
                .map_err(|_| self.invalid(name, raw)),
            Self::Choice(allowed) => {
                if allowed.iter().any(|choice| choice == raw) {
                    Ok(ArgValue::String(raw.to_string()))
                } else {
                    Err(MachError::InvalidChoice {
                        name: name.to_string(),
                        value: raw.to_string(),
                        allowed: allowed.clone(),
                    })
                }
            }
        }
    }

    fn invalid(&self, name: &str, raw: &str) -> MachError {
        MachError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
            expected: self.clone(),
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => f.write_str("flag"),
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Choice(allowed) => write!(f, "one of {}", allowed.join("|")),
        }
    }
}

/// A bound argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Bool(bool),
    String(String),
    Integer(i64),
}

impl ArgValue {
    /// Check that this value is acceptable for `kind`.
    fn conforms_to(&self, kind: &ArgKind) -> bool {
        match (kind, self) {
            (ArgKind::Flag, Self::Bool(_))
            | (ArgKind::String, Self::String(_))
            | (ArgKind::Integer, Self::Integer(_)) => true,
            (ArgKind::Choice(allowed), Self::String(s)) => allowed.contains(s),
            _ => false,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Schema entry describing one argument of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDef {
    pub name: String,
    pub kind: ArgKind,
    pub required: bool,
    pub default: Option<ArgValue>,
    pub help: String,
}

impl ArgumentDef {
    /// Create an optional argument of the given kind.
    pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            help: String::new(),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Flag)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Integer)
    }

    pub fn choice<I, S>(name: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, ArgKind::Choice(allowed.into_iter().map(Into::into).collect()))
    }

    /// Mark the argument as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the value used when an optional argument is absent.
    pub fn with_default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// The `--name` token for this argument.
    pub fn flag_token(&self) -> String {
        format!("--{}", self.name)
    }

    fn validate(&self) -> Result<(), SpecError> {
        if self.name.is_empty() || self.name.starts_with('-') || self.name.contains('=') {
            return Err(SpecError::InvalidArgumentName(self.name.clone()));
        }
        if self.name == RESERVED_HELP {
            return Err(SpecError::ReservedArgument(self.name.clone()));
        }
        if let ArgKind::Choice(allowed) = &self.kind
            && allowed.is_empty()
        {
            return Err(SpecError::EmptyChoices(self.name.clone()));
        }
        match &self.default {
            Some(_) if self.required => Err(SpecError::RequiredWithDefault(self.name.clone())),
            Some(value) if !value.conforms_to(&self.kind) => Err(SpecError::DefaultMismatch {
                name: self.name.clone(),
                value: value.to_string(),
                expected: self.kind.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Problems with a command declaration itself, detected before registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("command name must not be empty")]
    EmptyName,

    #[error("invalid command name '{0}'")]
    InvalidName(String),

    #[error("command name '{0}' is reserved")]
    ReservedName(String),

    #[error("invalid argument name '{0}'")]
    InvalidArgumentName(String),

    #[error("argument '{0}' is reserved")]
    ReservedArgument(String),

    #[error("argument '{0}' is declared more than once")]
    DuplicateArgument(String),

    #[error("required argument '{0}' cannot have a default")]
    RequiredWithDefault(String),

    #[error("choice argument '{0}' declares no choices")]
    EmptyChoices(String),

    #[error("default '{value}' for argument '{name}' is not a valid {expected}")]
    DefaultMismatch {
        name: String,
        value: String,
        expected: ArgKind,
    },

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
}

/// Registered metadata and handler for one named command.
#[derive(Clone)]
pub struct CommandSpec {
    name: String,
    description: String,
    category: Option<String>,
    arguments: Vec<ArgumentDef>,
    handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    /// Start building a spec for `name`.
    pub fn builder(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> CommandSpecBuilder {
        CommandSpecBuilder {
            spec: CommandSpec {
                name: name.into(),
                description: String::new(),
                category: None,
                arguments: Vec::new(),
                handler,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Argument schema in declaration order.
    pub fn arguments(&self) -> &[ArgumentDef] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDef> {
        self.arguments.iter().find(|arg| arg.name == name)
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// Replace the default of an optional argument with a value parsed from `raw`.
    ///
    /// Used for command-scoped defaults from the tree configuration.
    pub fn override_default(&mut self, name: &str, raw: &str) -> anyhow::Result<()> {
        let arg = self
            .arguments
            .iter_mut()
            .find(|arg| arg.name == name)
            .ok_or_else(|| SpecError::UnknownArgument(name.to_string()))?;
        if arg.required {
            return Err(SpecError::RequiredWithDefault(name.to_string()).into());
        }
        arg.default = Some(arg.kind.parse_value(name, raw)?);
        Ok(())
    }

    /// One-line usage, e.g. `build --target <string> [--jobs <integer>] [ARGS...]`.
    pub fn usage(&self) -> String {
        let mut parts = vec![self.name.clone()];
        for arg in &self.arguments {
            let token = match &arg.kind {
                ArgKind::Flag => arg.flag_token(),
                ArgKind::Choice(allowed) => format!("{} <{}>", arg.flag_token(), allowed.join("|")),
                kind => format!("{} <{kind}>", arg.flag_token()),
            };
            if arg.required {
                parts.push(token);
            } else {
                parts.push(format!("[{token}]"));
            }
        }
        parts.push("[ARGS...]".to_string());
        parts.join(" ")
    }

    /// Multi-line help: usage, description and one line per argument.
    pub fn help_text(&self) -> String {
        let mut out = format!("usage: mach {}\n", self.usage());
        if !self.description.is_empty() {
            out.push('\n');
            out.push_str(&self.description);
            out.push('\n');
        }
        if !self.arguments.is_empty() {
            out.push_str("\narguments:\n");
            let width = self
                .arguments
                .iter()
                .map(|arg| arg.flag_token().len())
                .max()
                .unwrap_or(0);
            for arg in &self.arguments {
                let mut line = format!("  {:<width$}  {}", arg.flag_token(), arg.help);
                if arg.required {
                    line.push_str(" (required)");
                } else if let Some(default) = &arg.default {
                    line.push_str(&format!(" (default: {default})"));
                }
                out.push_str(line.trim_end());
                out.push('\n');
            }
        }
        out
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("category", &self.category)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandSpec`]; validates the schema in [`build`](Self::build).
pub struct CommandSpecBuilder {
    spec: CommandSpec,
}

impl CommandSpecBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.spec.category = Some(category.into());
        self
    }

    /// Append an argument to the schema.
    pub fn argument(mut self, arg: ArgumentDef) -> Self {
        self.spec.arguments.push(arg);
        self
    }

    pub fn build(self) -> Result<CommandSpec, SpecError> {
        let spec = self.spec;
        if spec.name.is_empty() {
            return Err(SpecError::EmptyName);
        }
        if spec.name.starts_with('-') || spec.name.chars().any(char::is_whitespace) {
            return Err(SpecError::InvalidName(spec.name));
        }
        if spec.name == RESERVED_HELP {
            return Err(SpecError::ReservedName(spec.name));
        }
        let mut seen = HashSet::new();
        for arg in &spec.arguments {
            arg.validate()?;
            if !seen.insert(arg.name.as_str()) {
                return Err(SpecError::DuplicateArgument(arg.name.clone()));
            }
        }
        Ok(spec)
    }
}
