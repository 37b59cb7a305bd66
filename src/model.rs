//! RDF Model Facade (spec §4.3, C3).
//!
//! Wraps an [`oxrdf::Dataset`], the way `oxigraph`'s own store wraps it
//! internally, and exposes the narrow surface spec.md asks for: node and
//! statement constructors, parse/serialise, emptiness, and per-context
//! iteration. Parsing/serialising for the concrete syntaxes lives in
//! `serializers::rdf`; this module only owns the quad set itself plus the
//! MIME → internal-syntax-name table.

use oxrdf::{
    BlankNode, GraphName, Literal, NamedNode, Quad, Subject, Term,
};
use std::collections::BTreeSet;

use crate::error::{QuiltError, Result};

/// An in-memory set of quads (spec §3, "RDF Model").
#[derive(Debug, Clone, Default)]
pub struct Model {
    dataset: oxrdf::Dataset,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Adds a statement to the default graph.
    pub fn add(&mut self, subject: Subject, predicate: NamedNode, object: Term) {
        self.dataset
            .insert(Quad::new(subject, predicate, object, GraphName::DefaultGraph));
    }

    /// Adds a statement scoped to a named graph (spec §4.3
    /// "context-add-statement").
    pub fn add_in_context(
        &mut self,
        context: NamedNode,
        subject: Subject,
        predicate: NamedNode,
        object: Term,
    ) {
        self.dataset
            .insert(Quad::new(subject, predicate, object, GraphName::NamedNode(context)));
    }

    pub fn quads(&self) -> impl Iterator<Item = &Quad> {
        self.dataset.iter()
    }

    /// Every statement whose context equals `context` (default graph
    /// when `None`).
    pub fn quads_in_context(&self, context: Option<&NamedNode>) -> Vec<&Quad> {
        let target = match context {
            Some(n) => GraphName::NamedNode(n.clone()),
            None => GraphName::DefaultGraph,
        };
        self.dataset
            .iter()
            .filter(|q| q.graph_name == target)
            .collect()
    }

    /// Distinct named-graph contexts present in the model, in first-seen
    /// order (spec §5's ordering guarantee for JSON-LD).
    pub fn contexts(&self) -> Vec<NamedNode> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for q in self.dataset.iter() {
            if let GraphName::NamedNode(n) = &q.graph_name {
                if seen.insert(n.clone()) {
                    out.push(n.clone());
                }
            }
        }
        out
    }

    pub fn quads_for_subject<'a>(&'a self, subject: &'a Subject) -> impl Iterator<Item = &'a Quad> {
        self.dataset.iter().filter(move |q| &q.subject == subject)
    }

    pub fn merge(&mut self, other: Model) {
        for q in other.dataset.into_iter() {
            self.dataset.insert(q);
        }
    }
}

/// Node constructors (spec §4.3).
pub fn uri_node(iri: &str) -> Result<NamedNode> {
    NamedNode::new(iri).map_err(|e| QuiltError::internal(format!("invalid IRI {iri}: {e}")))
}

pub fn blank_node() -> BlankNode {
    BlankNode::default()
}

pub fn literal(value: &str) -> Literal {
    Literal::new_simple_literal(value)
}

pub fn literal_lang(value: &str, lang: &str) -> Result<Literal> {
    Literal::new_language_tagged_literal(value, lang)
        .map_err(|e| QuiltError::internal(format!("invalid language tag {lang}: {e}")))
}

pub fn literal_typed(value: &str, datatype: &NamedNode) -> Literal {
    Literal::new_typed_literal(value, datatype.clone())
}

pub fn literal_integer(value: i64) -> Literal {
    let xsd_integer = NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer");
    Literal::new_typed_literal(value.to_string(), xsd_integer)
}

/// Maps a MIME type to the RDF library's internal syntax name (spec
/// §4.3). Unknown MIME types pass through unchanged, as the source does
/// for plugin-supplied formats.
pub fn mime_to_syntax(mime: &str) -> &str {
    match mime.to_ascii_lowercase().as_str() {
        "text/turtle" => "turtle",
        "application/trig" => "trig",
        "application/n-triples" => "ntriples",
        "application/n-quads" => "nquads",
        "application/rdf+xml" => "rdfxml-abbrev",
        "application/ld+json" | "application/json" => "json",
        "text/html" => "html",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_query_roundtrip() {
        let mut m = Model::new();
        let s = Subject::NamedNode(uri_node("http://example.org/thing").unwrap());
        let p = uri_node("http://xmlns.com/foaf/0.1/name").unwrap();
        m.add(s.clone(), p, Term::Literal(literal("Alice")));
        assert_eq!(m.len(), 1);
        assert!(!m.is_empty());
        assert_eq!(m.quads_for_subject(&s).count(), 1);
    }

    #[test]
    fn mime_table_matches_spec() {
        assert_eq!(mime_to_syntax("application/n-quads"), "nquads");
        assert_eq!(mime_to_syntax("application/rdf+xml"), "rdfxml-abbrev");
        assert_eq!(mime_to_syntax("application/x-custom"), "application/x-custom");
    }
}
