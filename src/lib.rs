//! mach: a pluggable command dispatcher for source trees.
//!
//! Commands are declared by the tree (TOML declaration files listed in
//! `mach.toml`) or compiled in, registered once at startup, and then
//! dispatched by name with their arguments bound against a typed schema.

pub mod cli;
pub mod command;
pub mod internal;
pub mod utils;

pub use internal::{
    binder::ParsedArguments,
    context::ApplicationContext,
    dispatcher::{Dispatcher, Outcome, Phase},
    error::{MachError, MachResult},
    loader::{CommandSource, ModuleLoader},
    registry::{CommandHandler, CommandRegistry, HandlerError, HandlerResult, handler_fn},
    spec::{ArgKind, ArgValue, ArgumentDef, CommandSpec},
};
