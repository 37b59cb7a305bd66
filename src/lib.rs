//! Quilt: a Linked Open Data server that fronts a SPARQL store and
//! negotiates RDF/HTML serialisations of its graphs (spec §1).
//!
//! This crate is the library half shared by the `quilt-cli` and
//! `quilt-server` binaries: it owns every component (C1-C12) and
//! exposes one entry point, [`bootstrap`], that wires them together
//! from a loaded [`Config`].

pub mod adapter;
pub mod bulk;
pub mod canon;
pub mod config;
pub mod engines;
pub mod error;
pub mod logging;
pub mod model;
pub mod negotiate;
pub mod registry;
pub mod request;
pub mod serializers;
pub mod sparql;
pub mod template;

use std::path::Path;
use std::sync::Arc;

pub use config::Config;
pub use error::{QuiltError, Result};
pub use registry::Registry;
pub use template::Environment;

/// Every process-wide, write-once-read-many resource the request
/// pipeline needs (spec §5, "Shared resources"): the plugin registry,
/// the compiled template environment, and the config that produced
/// both. Built once at startup and shared behind `Arc` by every
/// request/connection thereafter.
pub struct App {
    pub config: Arc<Config>,
    pub registry: Registry,
    pub templates: Arc<Environment>,
}

/// Builds an [`App`] from a config file path (or [`Config::defaults`]
/// if `None`): loads templates from `html:templatedir`, registers the
/// configured engine, every built-in serialiser, and (when the engine
/// supports it) a bulk generator under the same name.
pub fn bootstrap(config_path: Option<&Path>) -> Result<App> {
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::defaults(),
    };
    let config = Arc::new(config);

    let templates = Arc::new(Environment::new());
    let template_dir = config.get_or("html", "templatedir", "templates");
    let template_dir = Path::new(&template_dir);
    if template_dir.is_dir() {
        templates.load_dir(template_dir)?;
    } else {
        tracing::warn!(dir = %template_dir.display(), "template directory not found; HTML responses will 404 on missing templates");
    }

    let mut registry = Registry::new();
    engines::register_configured(&mut registry, &config)?;
    serializers::register_all(&mut registry, &config, &templates);
    bulk::register(&mut registry, &config)?;

    Ok(App {
        config,
        registry,
        templates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_without_config_file_fails_without_an_engine() {
        // `quilt:engine` has no default (spec §6); a bare `bootstrap`
        // with no config file must surface that as a config error, not
        // panic or silently pick one.
        let err = bootstrap(None).unwrap_err();
        assert_eq!(err.status(), 500);
    }
}
