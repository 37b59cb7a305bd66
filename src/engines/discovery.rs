//! Shared discovery-triple helper (SPEC_FULL §2.2).
//!
//! `resource-graph` and `coref-index` both add a handful of triples to
//! aid client discovery once the graph-producing SPARQL query has run;
//! rather than duplicate that, both engines call into here.

use oxrdf::{NamedNode, Subject, Term};

use crate::model::{self, Model};

const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDFS_SEE_ALSO: &str = "http://www.w3.org/2000/01/rdf-schema#seeAlso";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const VOID_DATASET: &str = "http://rdfs.org/ns/void#Dataset";

/// `<subject> rdfs:label "label"@en`.
pub fn add_label(model: &mut Model, subject: &NamedNode, label: &str) {
    if let (Ok(p), Ok(lit)) = (
        model::uri_node(RDFS_LABEL),
        model::literal_lang(label, "en"),
    ) {
        model.add(Subject::NamedNode(subject.clone()), p, Term::Literal(lit));
    }
}

/// `<subject> a void:Dataset`.
pub fn add_dataset_type(model: &mut Model, subject: &NamedNode) {
    if let (Ok(p), Ok(o)) = (model::uri_node(RDF_TYPE), model::uri_node(VOID_DATASET)) {
        model.add(Subject::NamedNode(subject.clone()), p, Term::NamedNode(o));
    }
}

/// `<subject> rdfs:seeAlso <item>`.
pub fn add_see_also(model: &mut Model, subject: &NamedNode, item: &NamedNode) {
    if let Ok(p) = model::uri_node(RDFS_SEE_ALSO) {
        model.add(
            Subject::NamedNode(subject.clone()),
            p,
            Term::NamedNode(item.clone()),
        );
    }
}
