//! Argument binder: turns raw string tokens into typed arguments per a command's schema.
//!
//! Tokens are scanned left to right. A token starting with `--` names an
//! argument (`--name value`, `--name=value`, or a bare `--name` for flags);
//! a lone `--` ends flag recognition. Every other token is positional and
//! binds, in schema order, to the required arguments that no flag supplied.
//! Positional tokens left over after that are kept as trailing arguments.

use std::collections::HashMap;

use super::{
    error::{MachError, MachResult},
    spec::{ArgKind, ArgValue, ArgumentDef},
};

const FLAG_PREFIX: &str = "--";
const END_OF_FLAGS: &str = "--";

/// Arguments bound for a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArguments {
    values: HashMap<String, ArgValue>,
    trailing: Vec<String>,
}

impl ParsedArguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Value of a flag argument; `false` when unset.
    pub fn get_flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ArgValue::Bool(true)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Positional tokens that did not bind to a declared argument, in input order.
    pub fn trailing(&self) -> &[String] {
        &self.trailing
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.trailing.is_empty()
    }
}

/// Bind `tokens` against `schema`.
///
/// Defaults apply only to optional arguments absent from the input; absent
/// flags without a default bind `false`. The first required argument left
/// unbound (in schema order) is reported as missing.
pub fn bind<S: AsRef<str>>(schema: &[ArgumentDef], tokens: &[S]) -> MachResult<ParsedArguments> {
    let mut values = HashMap::new();
    let mut positionals = Vec::new();
    let mut tokens = tokens.iter().map(AsRef::as_ref);
    let mut flags_ended = false;

    while let Some(token) = tokens.next() {
        if !flags_ended && token == END_OF_FLAGS {
            flags_ended = true;
            continue;
        }
        let Some(body) = token.strip_prefix(FLAG_PREFIX).filter(|_| !flags_ended) else {
            positionals.push(token.to_string());
            continue;
        };

        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let def = schema
            .iter()
            .find(|arg| arg.name == name)
            .ok_or_else(|| MachError::UnknownFlag(format!("{FLAG_PREFIX}{name}")))?;

        let value = match (&def.kind, inline) {
            (ArgKind::Flag, None) => ArgValue::Bool(true),
            (kind, Some(raw)) => kind.parse_value(&def.name, raw)?,
            (kind, None) => {
                let raw = tokens.next().ok_or_else(|| MachError::InvalidValue {
                    name: def.name.clone(),
                    value: String::new(),
                    expected: kind.clone(),
                })?;
                kind.parse_value(&def.name, raw)?
            }
        };
        values.insert(def.name.clone(), value);
    }

    let mut positionals = positionals.into_iter();
    let unbound_required: Vec<&ArgumentDef> = schema
        .iter()
        .filter(|arg| arg.required && arg.kind.takes_value() && !values.contains_key(&arg.name))
        .collect();
    for def in unbound_required {
        let Some(raw) = positionals.next() else {
            break;
        };
        let value = def.kind.parse_value(&def.name, &raw)?;
        values.insert(def.name.clone(), value);
    }
    let trailing = positionals.collect();

    for def in schema {
        if values.contains_key(&def.name) {
            continue;
        }
        if def.required {
            return Err(MachError::MissingRequiredArgument(def.name.clone()));
        }
        match (&def.default, &def.kind) {
            (Some(default), _) => {
                values.insert(def.name.clone(), default.clone());
            }
            (None, ArgKind::Flag) => {
                values.insert(def.name.clone(), ArgValue::Bool(false));
            }
            (None, _) => {}
        }
    }

    Ok(ParsedArguments { values, trailing })
}
