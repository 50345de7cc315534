//! This is the main entry point for mach.

use std::io::IsTerminal;

use mach::{
    cli,
    internal::error::{EXIT_FAILURE, error_prefix},
};

fn main() {
    // Handler panics are caught and reported by the dispatcher; keep the
    // default hook from printing a second message.
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!(panic = %info, "panic captured");
    }));

    let code = match cli::parse(None) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", error_prefix(std::io::stderr().is_terminal()));
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
