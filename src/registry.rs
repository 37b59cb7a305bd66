//! Plugin Registry (spec §4.5, C5).
//!
//! Holds the process-wide, write-once-read-many tables of serialisers,
//! engines, and bulk generators (spec §5, "Shared resources"), plus the
//! media-type [`Negotiator`] every serialiser registration feeds.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{QuiltError, Result};
use crate::model::Model;
use crate::negotiate::Negotiator;
use crate::request::Request;

/// A serialiser callback: renders `model` for `request` into bytes.
pub type SerializeFn = Arc<dyn Fn(&Request, &Model) -> Result<Vec<u8>> + Send + Sync>;

/// An engine callback: populates `request`'s model, returns an HTTP
/// status per spec §4.6 step 6 (`0` = engine wrote output directly,
/// `200` = proceed to serialise, anything else = error).
pub type EngineFn = Arc<dyn Fn(&mut Request) -> Result<u16> + Send + Sync>;

/// A bulk-generator callback: given the page window an adapter's `-b`
/// invocation asked for, returns the absolute subject URIs the
/// configured engine knows how to resolve. The bulk driver (`bulk.rs`)
/// then runs each one through the ordinary request pipeline.
pub type BulkFn = Arc<dyn Fn(u32, u32) -> Result<Vec<String>> + Send + Sync>;

#[derive(Clone)]
pub struct SerializerEntry {
    pub mime: String,
    pub extensions: Vec<String>,
    pub description: String,
    pub qs: f64,
    pub visible: bool,
    pub callback: SerializeFn,
}

#[derive(Clone)]
pub struct EngineEntry {
    pub name: String,
    pub callback: EngineFn,
}

#[derive(Clone)]
pub struct BulkEntry {
    pub name: String,
    pub callback: BulkFn,
}

/// The plugin registry: serialisers keyed by MIME (re-registration
/// replaces), engines and bulk generators keyed by unique name (spec
/// §3, "Plugin Registration").
#[derive(Default)]
pub struct Registry {
    serializers: HashMap<String, SerializerEntry>,
    serializer_order: Vec<String>,
    engines: HashMap<String, EngineEntry>,
    bulk: HashMap<String, BulkEntry>,
    negotiator: Negotiator,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a serialiser. Re-registering the same MIME (case
    /// insensitive) replaces the earlier entry in place, preserving its
    /// original position in `serializer_order`.
    pub fn register_serializer(
        &mut self,
        mime: &str,
        extensions: &str,
        description: &str,
        qs: f64,
        visible: bool,
        callback: SerializeFn,
    ) {
        let key = mime.to_ascii_lowercase();
        let entry = SerializerEntry {
            mime: mime.to_string(),
            extensions: extensions
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            description: description.to_string(),
            qs,
            visible,
            callback,
        };
        if !self.serializers.contains_key(&key) {
            self.serializer_order.push(key.clone());
        }
        self.serializers.insert(key, entry);
        self.negotiator.add(mime, qs);
    }

    pub fn register_engine(&mut self, name: &str, callback: EngineFn) -> Result<()> {
        if self.engines.contains_key(name) {
            return Err(QuiltError::internal(format!(
                "engine '{name}' already registered"
            )));
        }
        self.engines.insert(
            name.to_string(),
            EngineEntry {
                name: name.to_string(),
                callback,
            },
        );
        Ok(())
    }

    pub fn register_bulk(&mut self, name: &str, callback: BulkFn) -> Result<()> {
        if self.bulk.contains_key(name) {
            return Err(QuiltError::internal(format!(
                "bulk generator '{name}' already registered"
            )));
        }
        self.bulk.insert(
            name.to_string(),
            BulkEntry {
                name: name.to_string(),
                callback,
            },
        );
        Ok(())
    }

    pub fn find_serializer_by_mime(&self, mime: &str) -> Option<&SerializerEntry> {
        self.serializers.get(&mime.to_ascii_lowercase())
    }

    /// Searches each serialiser's extension list, case-insensitively.
    pub fn find_serializer_by_extension(&self, ext: &str) -> Option<&SerializerEntry> {
        let ext = ext.to_ascii_lowercase();
        self.serializer_order.iter().find_map(|key| {
            let entry = &self.serializers[key];
            entry
                .extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&ext))
                .then_some(entry)
        })
    }

    pub fn find_engine_by_name(&self, name: &str) -> Option<&EngineEntry> {
        self.engines.get(name)
    }

    pub fn find_bulk_by_name(&self, name: &str) -> Option<&BulkEntry> {
        self.bulk.get(name)
    }

    /// Serialisers in registration order (spec §4.5's iteration order,
    /// used by the HTML serialiser's alternate-format `links`, spec
    /// §4.9).
    pub fn serializers(&self) -> impl Iterator<Item = &SerializerEntry> {
        self.serializer_order.iter().map(|key| &self.serializers[key])
    }

    pub fn negotiator_mut(&mut self) -> &mut Negotiator {
        &mut self.negotiator
    }

    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_serializer() -> SerializeFn {
        Arc::new(|_req, _model| Ok(Vec::new()))
    }

    #[test]
    fn reregistering_mime_replaces_in_place() {
        let mut reg = Registry::new();
        reg.register_serializer("text/turtle", "ttl", "Turtle", 1.0, true, noop_serializer());
        reg.register_serializer("application/ld+json", "jsonld json", "JSON-LD", 0.95, true, noop_serializer());
        reg.register_serializer("text/turtle", "ttl turtle", "Turtle v2", 0.9, true, noop_serializer());

        let order: Vec<&str> = reg.serializers().map(|e| e.mime.as_str()).collect();
        assert_eq!(order, vec!["text/turtle", "application/ld+json"]);
        assert_eq!(reg.find_serializer_by_mime("text/turtle").unwrap().description, "Turtle v2");
    }

    #[test]
    fn find_by_extension_is_case_insensitive() {
        let mut reg = Registry::new();
        reg.register_serializer("text/turtle", "ttl", "Turtle", 1.0, true, noop_serializer());
        assert!(reg.find_serializer_by_extension("TTL").is_some());
    }

    #[test]
    fn duplicate_engine_name_rejected() {
        let mut reg = Registry::new();
        reg.register_engine("resource-graph", Arc::new(|_r| Ok(200))).unwrap();
        assert!(reg.register_engine("resource-graph", Arc::new(|_r| Ok(200))).is_err());
    }
}
