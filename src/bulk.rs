//! Bulk-generation mode (spec §6, `-b`), ported from `cli.c`'s
//! `quilt_request_bulk`/`quilt_request_bulk_item` pair.
//!
//! The registered [`crate::registry::BulkFn`] only enumerates the page
//! of subject URIs the configured engine knows about; this module does
//! the rest of the original's job by driving each one through the
//! ordinary request pipeline and adapter.

use std::sync::Arc;

use crate::adapter::{self, Adapter};
use crate::config::Config;
use crate::error::{QuiltError, Result};
use crate::registry::Registry;
use crate::request::RawEnv;
use crate::template::Environment;

/// Runs bulk mode to completion: resolves the bulk generator for the
/// configured engine, enumerates `offset..offset+limit` subjects, and
/// renders each one through `adapter` in turn. A subject that errors
/// does not abort the run; it is logged and skipped, matching the
/// original's "one bad item doesn't fail the batch" behaviour.
pub fn run<A: Adapter>(
    registry: &Registry,
    config: &Config,
    templates: &Environment,
    accept: &str,
    offset: u32,
    limit: u32,
    adapter: &mut A,
) -> Result<()> {
    let engine_name = config.required("quilt", "engine")?.to_string();
    let bulk = registry
        .find_bulk_by_name(&engine_name)
        .ok_or_else(|| {
            QuiltError::internal(format!(
                "the current engine ('{engine_name}') does not support bulk-generation"
            ))
        })?;

    let subjects = (bulk.callback)(offset, limit)?;
    let base = config.get_or("quilt", "base", "http://www.example.com/");

    for subject in subjects {
        let path = subject
            .strip_prefix(base.trim_end_matches('/'))
            .unwrap_or(subject.as_str());
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        let env = RawEnv {
            request_uri: path,
            method: "GET".to_string(),
            accept: accept.to_string(),
            host: None,
            user_agent: None,
            referer: None,
            ident: None,
            remote_addr: None,
        };

        if let Err(e) = adapter::run(registry, config, templates, env, adapter) {
            tracing::warn!(subject = %subject, error = %e, "skipping bulk item");
        }
    }

    Ok(())
}

/// Registers bulk generators for every engine that supports them
/// (spec §6's `-b`; SPEC_FULL §2). Separate from `engines::register_configured`
/// so that front-ends which never run in bulk mode (the socket adapter)
/// can skip this step entirely.
pub fn register(registry: &mut Registry, config: &Arc<Config>) -> Result<()> {
    crate::engines::register_bulk_configured(registry, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bulk_support_is_an_error() {
        let mut config = Config::defaults();
        config.set("quilt", "engine", "file");
        let registry = Registry::new();
        let templates = Environment::new();
        struct Sink;
        impl Adapter for Sink {
            fn getenv(&self, _name: &str) -> Option<String> {
                None
            }
            fn getparam(&self, _name: &str) -> Option<String> {
                None
            }
            fn getparam_multi(&self, _name: &str) -> Option<Vec<String>> {
                None
            }
            fn put(&mut self, _bytes: &[u8]) -> Result<()> {
                Ok(())
            }
            fn header(&mut self, _line: &[u8]) -> Result<()> {
                Ok(())
            }
        }
        let mut sink = Sink;
        let err = run(&registry, &config, &templates, "text/turtle", 0, 10, &mut sink)
            .unwrap_err();
        assert_eq!(err.status(), 500);
    }
}
