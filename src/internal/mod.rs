//! Dispatch core: command specs, registry, argument binder, dispatcher, module loader,
//! tree configuration and the shell handler for declared commands.

pub mod binder;
pub mod config;
pub mod context;
pub mod declaration;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod loader;
pub mod registry;
pub mod spec;
