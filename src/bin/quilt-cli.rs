//! The single-shot CLI front-end (spec §6, "CLI").
//!
//! Renders one request (or, with `-b`, a page of bulk items) against
//! the environment-variable surface a FastCGI/CGI wrapper would set,
//! writing a CGI-style header block followed by the body to stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use quilt::adapter::CliAdapter;
use quilt::bootstrap;

#[derive(Parser)]
#[command(name = "quilt-cli", about, version)]
/// Render a single Quilt request (or a bulk page) from the command line.
struct Args {
    /// Path to the configuration file.
    ///
    /// Defaults to `$QUILT_CONFIG`, or the built-in defaults if unset.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the `Accept` header used for content negotiation.
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    accept_type: Option<String>,

    /// Logs at debug level to stderr.
    #[arg(short = 'd')]
    debug: bool,

    /// Bulk mode: render a page of resources instead of one REQUEST-URI.
    #[arg(short = 'b')]
    bulk: bool,

    /// Page size for bulk mode.
    #[arg(short = 'L', value_name = "LIMIT")]
    limit: Option<u32>,

    /// Page offset for bulk mode.
    #[arg(short = 'O', value_name = "OFFSET")]
    offset: Option<u32>,

    /// Overrides the raw query string.
    #[arg(short = 'q', value_name = "QUERY")]
    query: Option<String>,

    /// The request URI to render. Omitted in bulk mode.
    #[arg(required_unless_present = "bulk")]
    request_uri: Option<String>,
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

    let accept = args
        .accept_type
        .or_else(|| std::env::var("HTTP_ACCEPT").ok())
        .unwrap_or_else(|| "text/turtle".to_string());

    if args.bulk {
        let offset = args.offset.unwrap_or(0);
        let limit = args.limit.unwrap_or(quilt::request::DEFAULT_LIMIT);
        let mut adapter = CliAdapter::from_process_env(None);
        if let Err(e) = quilt::bulk::run(
            &app.registry,
            &app.config,
            &app.templates,
            &accept,
            offset,
            limit,
            &mut adapter,
        ) {
            tracing::error!(error = %e, "bulk run failed");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let Some(request_uri) = args.request_uri else {
        tracing::error!("REQUEST-URI is required outside of bulk mode");
        return ExitCode::FAILURE;
    };

    let mut adapter = CliAdapter::from_process_env(args.query.as_deref());
    let request_uri = match &args.query {
        Some(q) => format!("{}?{q}", request_uri.split('?').next().unwrap_or(&request_uri)),
        None => request_uri,
    };
    let env = adapter.raw_env(&request_uri, Some(&accept));

    match quilt::adapter::run(&app.registry, &app.config, &app.templates, env, &mut adapter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "request failed before a response could be written");
            ExitCode::SUCCESS
        }
    }
}
