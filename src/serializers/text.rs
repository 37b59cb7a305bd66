//! Plain-text serialiser (spec §4.11, SPEC_FULL §2.4).
//!
//! For each context, prints `According to <ctx>:` followed by a
//! paragraph per subject: `  <subject> is a <types…>:` then each
//! predicate indented two further spaces as `    <pred> : <value>`.
//! Subjects are de-duplicated via an in-memory set so a subject that
//! recurs in a later context is never printed twice.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use oxrdf::{NamedNode, Subject, Term};

use crate::model::Model;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub fn serialize(model: &Model) -> Vec<u8> {
    let mut out = String::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    let mut contexts: Vec<Option<NamedNode>> = vec![None];
    contexts.extend(model.contexts().into_iter().map(Some));

    for context in contexts {
        let quads = model.quads_in_context(context.as_ref());
        if quads.is_empty() {
            continue;
        }
        let ctx_label = context
            .as_ref()
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|| "the default graph".to_string());
        let _ = writeln!(out, "According to {ctx_label}:");

        let mut subjects: Vec<&Subject> = Vec::new();
        let mut subject_order: BTreeSet<String> = BTreeSet::new();
        for q in &quads {
            let key = q.subject.to_string();
            if subject_order.insert(key) {
                subjects.push(&q.subject);
            }
        }

        for subject in subjects {
            let key = subject.to_string();
            if !seen.insert(key) {
                continue;
            }
            let types: Vec<&Term> = quads
                .iter()
                .filter(|q| &q.subject == subject && q.predicate.as_str() == RDF_TYPE)
                .map(|q| &q.object)
                .collect();
            let type_list = if types.is_empty() {
                "a resource".to_string()
            } else {
                types
                    .iter()
                    .map(|t| term_label(t))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let _ = writeln!(out, "  {subject} is a {type_list}:");

            for q in quads.iter().filter(|q| &q.subject == subject && q.predicate.as_str() != RDF_TYPE) {
                let _ = writeln!(out, "    {} : {}", q.predicate.as_str(), term_label(&q.object));
            }
        }
        out.push('\n');
    }

    out.into_bytes()
}

fn term_label(t: &Term) -> String {
    match t {
        Term::NamedNode(n) => n.as_str().to_string(),
        Term::BlankNode(b) => format!("_:{}", b.as_str()),
        Term::Literal(lit) => lit.value().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;

    #[test]
    fn prints_subject_once_per_context_set() {
        let mut m = Model::new();
        let s = Subject::NamedNode(model::uri_node("http://example.org/thing").unwrap());
        let p = model::uri_node("http://xmlns.com/foaf/0.1/name").unwrap();
        m.add(s, p, Term::Literal(model::literal("Alice")));
        let text = String::from_utf8(serialize(&m)).unwrap();
        assert!(text.contains("According to the default graph:"));
        assert!(text.contains("http://example.org/thing is a a resource:"));
        assert!(text.contains("Alice"));
    }
}
