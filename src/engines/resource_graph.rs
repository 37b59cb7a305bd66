//! `resource-graph` engine (spec §4.7).
//!
//! Builds a single `SELECT * WHERE { GRAPH <subject> { ?s ?p ?o } }`
//! query where `subject` is the absolute request URI; an empty result
//! set is a 404.

use crate::engines::discovery;
use crate::error::Result;
use crate::model;
use crate::registry::{BulkFn, EngineFn};
use crate::request::Request;
use crate::sparql::SparqlClient;

pub fn build(sparql: SparqlClient) -> EngineFn {
    super::arc_engine(move |req: &mut Request| -> Result<u16> {
        let subject = req.absolute_uri();
        let query = format!(
            "SELECT * WHERE {{ GRAPH <{subject}> {{ ?s ?p ?o }} }} LIMIT {} OFFSET {}",
            req.limit, req.offset
        );
        sparql.query_to_model(&query, &mut req.model)?;

        if req.model.is_empty() {
            return Ok(404);
        }

        if let Ok(node) = model::uri_node(&subject) {
            discovery::add_dataset_type(&mut req.model, &node);
            req.base_graph = Some(node);
        }
        Ok(200)
    })
}

/// Bulk enumeration for this engine: every named graph is one subject
/// in the model's sense, so the page of graph names *is* the page of
/// bulk items.
pub fn build_bulk(sparql: SparqlClient) -> BulkFn {
    std::sync::Arc::new(move |offset: u32, limit: u32| -> Result<Vec<String>> {
        let query = format!(
            "SELECT DISTINCT ?g WHERE {{ GRAPH ?g {{ ?s ?p ?o }} }} LIMIT {limit} OFFSET {offset}"
        );
        sparql.query_to_list(&query, "g")
    })
}
