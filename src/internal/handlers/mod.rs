//! Command handler implementations shared by declared commands.

pub mod shell;

pub use shell::{CommandTemplate, ShellHandler};
