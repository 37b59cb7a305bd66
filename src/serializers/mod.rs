//! Serialiser registration (spec §4.9–§4.11, C9–C11): wires every
//! concrete format into the [`Registry`] with its MIME, extensions,
//! description and server-side `qs`.

pub mod html;
pub mod jsonld;
pub mod rdf;
pub mod text;

use std::sync::Arc;

use crate::config::Config;
use crate::error::QuiltError;
use crate::registry::Registry;
use crate::template::Environment;

use self::html::SiblingFormat;
use self::jsonld::JsonLdContext;

/// Registers every built-in serialiser (spec §4.11's RDF formats plus
/// the HTML and JSON-LD serialisers of §4.9/§4.10). HTML is registered
/// last so its `links` field can be pre-baked with every sibling format
/// that came before it, avoiding a registry-inside-itself reference.
pub fn register_all(registry: &mut Registry, config: &Arc<Config>, templates: &Arc<Environment>) {
    let prefixes = config.section_entries("namespaces");

    registry.register_serializer(
        "text/turtle",
        "ttl",
        "Turtle",
        1.0,
        true,
        Arc::new({
            let prefixes = prefixes.clone();
            move |_req, model| rdf::serialize_turtle(model, &prefixes)
        }),
    );

    registry.register_serializer(
        "application/rdf+xml",
        "rdf xml",
        "RDF/XML",
        0.8,
        true,
        Arc::new(|_req, model| rdf::serialize_rdfxml(model)),
    );

    registry.register_serializer(
        "application/n-triples",
        "nt ntriples",
        "N-Triples",
        0.7,
        true,
        Arc::new(|_req, model| rdf::serialize_ntriples(model)),
    );

    registry.register_serializer(
        "application/n-quads",
        "nq nquads",
        "N-Quads",
        0.6,
        true,
        Arc::new(|_req, model| rdf::serialize_nquads(model)),
    );

    registry.register_serializer(
        "text/plain",
        "txt",
        "Plain text",
        0.5,
        true,
        Arc::new(|_req, model| Ok(text::serialize(model))),
    );

    let jsonld_ctx = Arc::new(JsonLdContext::from_config(config));
    let base_for_jsonld = config.get_or("quilt", "base", "http://www.example.com/");
    registry.register_serializer(
        "application/ld+json",
        "jsonld json",
        "JSON-LD",
        0.95,
        true,
        Arc::new(move |req, model| {
            let primary = req.canon.to_string_with(
                crate::canon::Projection::SUBJECT | crate::canon::Projection::FRAGMENT,
            );
            let doc = jsonld::serialize(model, &jsonld_ctx, &base_for_jsonld, false, Some(&primary));
            serde_json::to_vec_pretty(&doc)
                .map_err(|e| QuiltError::internal(format!("encoding JSON-LD: {e}")))
        }),
    );

    let siblings: Vec<SiblingFormat> = registry
        .serializers()
        .filter(|e| e.visible)
        .filter_map(|e| {
            let ext = e.extensions.iter().min_by_key(|x| x.len())?;
            Some(SiblingFormat {
                mime: e.mime.clone(),
                extension: ext.clone(),
                description: e.description.clone(),
            })
        })
        .collect();

    let html_config = Arc::clone(config);
    let html_templates = Arc::clone(templates);
    registry.register_serializer(
        "text/html",
        "html htm",
        "HTML",
        0.9,
        true,
        Arc::new(move |req, model| {
            html::serialize(req, model, &siblings, &html_config, &html_templates)
        }),
    );
}
