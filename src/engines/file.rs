//! `file` engine (spec §4.7).
//!
//! Reads Turtle files from a configured root: `/foo/bar` maps to
//! `<root>/foo/bar.ttl`; home maps to `<root>/index.ttl`. Parse errors
//! yield 503 (the file exists but is unusable); a missing file yields
//! 404.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{QuiltError, Result};
use crate::registry::EngineFn;
use crate::request::Request;
use crate::serializers::rdf;

pub fn build(config: &Config) -> Result<EngineFn> {
    let root = PathBuf::from(config.required("file", "root")?);
    Ok(super::arc_engine(move |req: &mut Request| -> Result<u16> {
        let path = resolve(&root, &req.path);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(404),
            Err(e) => {
                return Err(QuiltError::internal(format!(
                    "reading {}: {e}",
                    path.display()
                )))
            }
        };
        match rdf::parse_turtle(&bytes, &req.absolute_uri()) {
            Ok(model) => {
                req.model.merge(model);
                Ok(200)
            }
            Err(_) => Ok(503),
        }
    }))
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    if path == "/" {
        return root.join("index.ttl");
    }
    let relative = path.trim_start_matches('/');
    root.join(format!("{relative}.ttl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_maps_home_to_index() {
        let root = PathBuf::from("/srv/quilt");
        assert_eq!(resolve(&root, "/"), root.join("index.ttl"));
        assert_eq!(resolve(&root, "/foo/bar"), root.join("foo/bar.ttl"));
    }
}
