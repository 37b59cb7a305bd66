//! `coref-index` engine (spec §4.7, SPEC_FULL §2.1).
//!
//! Dispatches on the request path against a configured table of
//! `{path, title, classURI}` index descriptors:
//!  - the home path enumerates every configured index as `rdfs:seeAlso`;
//!  - a configured index path runs the two-query index listing (subjects
//!    of the class, then a UNION of per-subject metadata);
//!  - anything else is treated as an item lookup via `resource-graph`'s
//!    single-subject query.

use crate::config::Config;
use crate::engines::discovery;
use crate::error::Result;
use crate::model::{self, Model};
use crate::registry::{BulkFn, EngineFn};
use crate::request::Request;
use crate::sparql::{escape_for_filter, SparqlClient};

/// One row of the `coref:index` configuration table.
#[derive(Debug, Clone)]
struct IndexDescriptor {
    path: String,
    title: String,
    class_uri: String,
}

fn load_indices(config: &Config) -> Vec<IndexDescriptor> {
    // Each `coref:index` line has the form "path|title|classURI".
    config
        .get_all("coref", "index")
        .iter()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '|');
            Some(IndexDescriptor {
                path: parts.next()?.trim().to_string(),
                title: parts.next()?.trim().to_string(),
                class_uri: parts.next()?.trim().to_string(),
            })
        })
        .collect()
}

pub fn build(sparql: SparqlClient, config: &Config) -> EngineFn {
    let indices = load_indices(config);
    super::arc_engine(move |req: &mut Request| -> Result<u16> {
        if req.home {
            return home(req, &indices);
        }
        if let Some(desc) = indices.iter().find(|d| d.path == req.path) {
            return index(req, &sparql, desc);
        }
        item(req, &sparql)
    })
}

/// Home page: enumerate every configured index as `rdfs:seeAlso`.
fn home(req: &mut Request, indices: &[IndexDescriptor]) -> Result<u16> {
    if let Ok(subject) = model::uri_node(&req.absolute_uri()) {
        discovery::add_label(&mut req.model, &subject, "Home");
        discovery::add_dataset_type(&mut req.model, &subject);
        for desc in indices {
            let item_uri = format!("{}{}", req.base.trim_end_matches('/'), desc.path);
            if let Ok(item) = model::uri_node(&item_uri) {
                discovery::add_see_also(&mut req.model, &subject, &item);
            }
        }
    }
    Ok(200)
}

/// Index landing page: a `void:Dataset` page listing subjects of the
/// configured class, newest first.
fn index(req: &mut Request, sparql: &SparqlClient, desc: &IndexDescriptor) -> Result<u16> {
    let order_limit = if req.offset == 0 {
        format!("ORDER BY DESC(?modified) LIMIT {}", req.limit)
    } else {
        format!(
            "ORDER BY DESC(?modified) OFFSET {} LIMIT {}",
            req.offset, req.limit
        )
    };
    let listing = format!(
        "SELECT ?s ?modified WHERE {{ ?s a <{}> ; <http://purl.org/dc/terms/modified> ?modified }} {}",
        desc.class_uri, order_limit
    );

    let mut listing_model = Model::new();
    sparql.query_to_model(&listing, &mut listing_model)?;

    let subjects: Vec<String> = listing_model
        .quads()
        .map(|q| q.subject.to_string())
        .collect();

    if !subjects.is_empty() {
        let filters: Vec<String> = subjects
            .iter()
            .map(|s| {
                let escaped = escape_for_filter(s.trim_matches(|c| c == '<' || c == '>'));
                format!("{{ ?s2 ?p2 ?o2 . FILTER(?s2 = <{escaped}>) }}")
            })
            .collect();
        let metadata = format!("SELECT ?s2 ?p2 ?o2 WHERE {{ {} }}", filters.join(" UNION "));
        sparql.query_to_model(&metadata, &mut req.model)?;
    }

    if let Ok(subject) = model::uri_node(&req.absolute_uri()) {
        discovery::add_label(&mut req.model, &subject, &desc.title);
        discovery::add_dataset_type(&mut req.model, &subject);
        for s in &subjects {
            if let Ok(item) = model::uri_node(s.trim_matches(|c| c == '<' || c == '>')) {
                discovery::add_see_also(&mut req.model, &subject, &item);
            }
        }
    }

    Ok(200)
}

/// Bulk enumeration: subjects of every configured index's class, in
/// declaration order, paged by the requested offset/limit window.
pub fn build_bulk(sparql: SparqlClient, config: &Config) -> BulkFn {
    let indices = load_indices(config);
    std::sync::Arc::new(move |offset: u32, limit: u32| -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut skipped = 0u32;
        for desc in &indices {
            if out.len() as u32 >= limit {
                break;
            }
            let query = format!(
                "SELECT ?s WHERE {{ ?s a <{}> }} ORDER BY ?s",
                desc.class_uri
            );
            let subjects = sparql.query_to_list(&query, "s")?;
            for s in subjects {
                if skipped < offset {
                    skipped += 1;
                    continue;
                }
                if out.len() as u32 >= limit {
                    break;
                }
                out.push(s);
            }
        }
        Ok(out)
    })
}

/// Item lookup: identical shape to the `resource-graph` engine's single
/// query, scoped by the request's absolute URI.
fn item(req: &mut Request, sparql: &SparqlClient) -> Result<u16> {
    let subject = req.absolute_uri();
    let query = format!("SELECT * WHERE {{ GRAPH <{subject}> {{ ?s ?p ?o }} }}");
    sparql.query_to_model(&query, &mut req.model)?;
    if req.model.is_empty() {
        return Ok(404);
    }
    Ok(200)
}
