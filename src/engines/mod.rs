//! Engines (spec §4.7, C7).
//!
//! Every engine shares the contract named in spec §4.6 step 6: given a
//! request, mutate its model and return an HTTP status code. Each
//! submodule here builds one [`crate::registry::EngineFn`] closure over
//! its own configuration, registered under its name in `quilt:engine`.

pub mod coref;
pub mod discovery;
pub mod file;
pub mod resource_graph;
pub mod s3;

use crate::config::Config;
use crate::registry::{EngineFn, Registry};
use crate::sparql::SparqlClient;
use std::sync::Arc;

/// Registers a bulk generator under the configured engine's name, for
/// the engines that support bulk enumeration (`resource-graph`,
/// `coref-index`). `file` and `s3` have no notion of "every resource"
/// and are silently skipped, matching the original's "the current
/// engine does not support bulk-generation" behaviour (spec §6, `-b`).
pub fn register_bulk_configured(registry: &mut Registry, config: &Config) -> crate::error::Result<()> {
    let name = config.required("quilt", "engine")?.to_string();
    let sparql = SparqlClient::new(
        config.get_or("sparql", "query", "http://localhost/sparql/"),
        config.get_bool("sparql", "verbose", false),
    );

    let callback: Option<crate::registry::BulkFn> = match name.as_str() {
        "resource-graph" => Some(resource_graph::build_bulk(sparql)),
        "coref-index" => Some(coref::build_bulk(sparql, config)),
        _ => None,
    };
    if let Some(callback) = callback {
        registry.register_bulk(&name, callback)?;
    }
    Ok(())
}

/// Builds and registers the single engine named by `quilt:engine`,
/// failing startup if the name is unknown (spec §4.6 step 5's "sanity
/// check runs once at init").
pub fn register_configured(registry: &mut Registry, config: &Config) -> crate::error::Result<()> {
    let name = config.required("quilt", "engine")?.to_string();
    let sparql = SparqlClient::new(
        config.get_or("sparql", "query", "http://localhost/sparql/"),
        config.get_bool("sparql", "verbose", false),
    );

    let callback: EngineFn = match name.as_str() {
        "resource-graph" => resource_graph::build(sparql),
        "coref-index" => coref::build(sparql, config),
        "file" => file::build(config)?,
        "s3" => s3::build(config)?,
        other => return Err(crate::error::QuiltError::EngineMissing(other.to_string())),
    };
    registry.register_engine(&name, callback)?;
    Ok(())
}

pub(crate) fn arc_engine<F>(f: F) -> EngineFn
where
    F: Fn(&mut crate::request::Request) -> crate::error::Result<u16> + Send + Sync + 'static,
{
    Arc::new(f)
}
