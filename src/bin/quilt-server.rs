//! The long-running front-end (spec §6, "Long-running front-end"):
//! listens on a socket path or `host:port` read from config and renders
//! every incoming connection through the request pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use quilt::adapter;
use quilt::bootstrap;

#[derive(Parser)]
#[command(name = "quilt-server", about, version)]
/// Run Quilt as a long-running HTTP server.
struct Args {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Logs at debug level to stderr.
    #[arg(short = 'd')]
    debug: bool,

    /// Host and port to listen on, overriding `fastcgi:socket`.
    #[arg(short, long, value_name = "HOST:PORT")]
    bind: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    quilt::logging::init(args.debug);

    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("QUILT_CONFIG").ok().map(PathBuf::from));

    let app = match bootstrap(config_path.as_deref()) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let bind = args
        .bind
        .unwrap_or_else(|| app.config.get_or("fastcgi", "socket", "localhost:8080"));
    let bind = match bind.strip_prefix("tcp://") {
        Some(rest) => rest.to_string(),
        None => bind,
    };
    if bind.starts_with("file://") || bind.starts_with('/') {
        tracing::error!(
            bind = %bind,
            "quilt-server listens on host:port; a filesystem socket path requires a FastCGI front-end, which is out of scope here"
        );
        return ExitCode::FAILURE;
    }

    tracing::info!(bind = %bind, "quilt-server listening");

    let registry = Arc::new(app.registry);
    match adapter::serve_forever(&bind, registry, app.config, app.templates) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server exited");
            ExitCode::FAILURE
        }
    }
}
