//! Template Engine (spec §4.8, C8): a Liquid subset ported from
//! `libliquify/`. The environment owns every compiled template for the
//! process lifetime (spec §5, "Shared resources").

pub mod ast;
pub mod blocks;
pub mod filters;
pub mod interp;
pub mod lexer;
pub mod parser;

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{QuiltError, Result};
use ast::Template;
use interp::TemplateLoader;

/// The compiled-template environment. Templates loaded mid-request are
/// added under the environment's exclusive lock, per spec §5; in
/// practice every template is loaded eagerly at startup from
/// `html:templatedir`.
pub struct Environment {
    templates: RwLock<HashMap<String, Template>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Loads every `*.liquid` file in `dir`, keyed by file stem.
    pub fn load_dir(&self, dir: &Path) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| QuiltError::internal(format!("reading {}: {e}", dir.display())))?;
        for entry in entries {
            let entry = entry.map_err(|e| QuiltError::internal(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("liquid") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)
                .map_err(|e| QuiltError::internal(format!("reading {}: {e}", path.display())))?;
            self.add(stem, &source)?;
        }
        Ok(())
    }

    /// Parses and registers a template under `name`. Re-registering a
    /// name replaces the earlier compiled template.
    pub fn add(&self, name: &str, source: &str) -> Result<()> {
        let compiled = parser::parse(name, source).map_err(|e| {
            QuiltError::internal(format!("template parse error: {e}"))
        })?;
        self.templates
            .write()
            .map_err(|_| QuiltError::internal("template environment lock poisoned"))?
            .insert(name.to_string(), compiled);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.templates
            .read()
            .map(|t| t.contains_key(name))
            .unwrap_or(false)
    }

    /// Applies the template named `name` against `dict`.
    pub fn apply(&self, name: &str, dict: &Value) -> Result<String> {
        let templates = self
            .templates
            .read()
            .map_err(|_| QuiltError::internal("template environment lock poisoned"))?;
        let template = templates
            .get(name)
            .ok_or_else(|| QuiltError::internal(format!("template '{name}' not registered")))?;
        interp::apply(self, template, dict)
            .map_err(|e| QuiltError::internal(format!("template '{name}' apply error: {e}")))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateLoader for Environment {
    fn load(&self, name: &str) -> Option<Template> {
        self.templates.read().ok()?.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_apply_round_trip_for_literal_template() {
        let env = Environment::new();
        env.add("greeting", "hello, world").unwrap();
        assert_eq!(env.apply("greeting", &Value::Null).unwrap(), "hello, world");
    }

    #[test]
    fn re_adding_a_name_replaces_it() {
        let env = Environment::new();
        env.add("t", "one").unwrap();
        env.add("t", "two").unwrap();
        assert_eq!(env.apply("t", &Value::Null).unwrap(), "two");
    }
}
