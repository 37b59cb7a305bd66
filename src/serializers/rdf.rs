//! Other Serialisers (spec §4.11, C11) and the parse half of the RDF
//! Model Facade's `parse(buffer, mime)` (spec §4.3): Turtle, RDF/XML,
//! N-Triples, and N-Quads via `rio_turtle`/`rio_xml`, the way
//! `samyama-ai-samyama-graph` pins and uses that crate family.

use rio_api::formatter::TriplesFormatter;
use rio_api::model::{
    BlankNode as RioBlankNode, GraphName as RioGraphName, Literal as RioLiteral,
    NamedNode as RioNamedNode, NamedOrBlankNode as RioSubject, Quad as RioQuad,
    Term as RioTerm, Triple as RioTriple,
};
use rio_api::parser::{QuadsParser, TriplesParser};
use rio_turtle::{NQuadsParser, NTriplesParser, TurtleFormatter, TurtleParser};
use rio_xml::RdfXmlParser;

use oxrdf::{BlankNode, GraphName, Literal, NamedNode, Quad, Subject, Term};

use crate::error::{QuiltError, Result};
use crate::model::Model;

fn rio_term_to_oxrdf(term: RioTerm<'_>) -> Term {
    match term {
        RioTerm::NamedNode(n) => Term::NamedNode(NamedNode::new_unchecked(n.iri)),
        RioTerm::BlankNode(b) => Term::BlankNode(BlankNode::new_unchecked(b.id)),
        RioTerm::Literal(RioLiteral::Simple { value }) => {
            Term::Literal(Literal::new_simple_literal(value))
        }
        RioTerm::Literal(RioLiteral::LanguageTaggedString { value, language }) => {
            Term::Literal(Literal::new_language_tagged_literal_unchecked(value, language))
        }
        RioTerm::Literal(RioLiteral::Typed { value, datatype }) => Term::Literal(
            Literal::new_typed_literal(value, NamedNode::new_unchecked(datatype.iri)),
        ),
        RioTerm::Triple(_) => Term::BlankNode(BlankNode::default()),
    }
}

fn rio_subject_to_oxrdf(subject: RioSubject<'_>) -> Subject {
    match subject {
        RioSubject::NamedNode(n) => Subject::NamedNode(NamedNode::new_unchecked(n.iri)),
        RioSubject::BlankNode(b) => Subject::BlankNode(BlankNode::new_unchecked(b.id)),
        RioSubject::Triple(_) => Subject::BlankNode(BlankNode::default()),
    }
}

/// Parses a Turtle buffer into a fresh [`Model`], using `base_iri` to
/// resolve relative IRIs (spec §4.3 `parse(buffer, mime)`).
pub fn parse_turtle(bytes: &[u8], base_iri: &str) -> Result<Model> {
    let mut model = Model::new();
    let mut parser = TurtleParser::new(bytes, Some(base_iri.parse().map_err(|e| {
        QuiltError::internal(format!("invalid base IRI {base_iri}: {e}"))
    })?));
    parser
        .parse_all(&mut |t: RioTriple<'_>| -> std::result::Result<(), rio_turtle::TurtleError> {
            model.add(
                rio_subject_to_oxrdf(t.subject),
                NamedNode::new_unchecked(t.predicate.iri),
                rio_term_to_oxrdf(t.object),
            );
            Ok(())
        })
        .map_err(|e| QuiltError::internal(format!("Turtle parse error: {e}")))?;
    Ok(model)
}

fn parse_ntriples(bytes: &[u8]) -> Result<Model> {
    let mut model = Model::new();
    let mut parser = NTriplesParser::new(bytes);
    parser
        .parse_all(&mut |t: RioTriple<'_>| -> std::result::Result<(), rio_turtle::TurtleError> {
            model.add(
                rio_subject_to_oxrdf(t.subject),
                NamedNode::new_unchecked(t.predicate.iri),
                rio_term_to_oxrdf(t.object),
            );
            Ok(())
        })
        .map_err(|e| QuiltError::internal(format!("N-Triples parse error: {e}")))?;
    Ok(model)
}

fn parse_nquads(bytes: &[u8]) -> Result<Model> {
    let mut model = Model::new();
    let mut parser = NQuadsParser::new(bytes);
    parser
        .parse_all(&mut |q: RioQuad<'_>| -> std::result::Result<(), rio_turtle::TurtleError> {
            let subject = rio_subject_to_oxrdf(q.subject);
            let predicate = NamedNode::new_unchecked(q.predicate.iri);
            let object = rio_term_to_oxrdf(q.object);
            match q.graph_name {
                Some(RioGraphName::NamedNode(RioNamedNode { iri })) => {
                    model.add_in_context(NamedNode::new_unchecked(iri), subject, predicate, object)
                }
                _ => model.add(subject, predicate, object),
            }
            Ok(())
        })
        .map_err(|e| QuiltError::internal(format!("N-Quads parse error: {e}")))?;
    Ok(model)
}

fn parse_rdfxml(bytes: &[u8], base_iri: &str) -> Result<Model> {
    let mut model = Model::new();
    let mut parser = RdfXmlParser::new(bytes, Some(base_iri.parse().map_err(|e| {
        QuiltError::internal(format!("invalid base IRI {base_iri}: {e}"))
    })?));
    parser
        .parse_all(&mut |t: RioTriple<'_>| -> std::result::Result<(), rio_xml::RdfXmlError> {
            model.add(
                rio_subject_to_oxrdf(t.subject),
                NamedNode::new_unchecked(t.predicate.iri),
                rio_term_to_oxrdf(t.object),
            );
            Ok(())
        })
        .map_err(|e| QuiltError::internal(format!("RDF/XML parse error: {e}")))?;
    Ok(model)
}

/// Dispatches on a Content-Type string to the matching parser (used by
/// the `file` and `s3` engines).
pub fn parse_bytes(bytes: &[u8], content_type: &str, base_iri: &str) -> Result<Model> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "text/turtle" => parse_turtle(bytes, base_iri),
        "application/n-triples" => parse_ntriples(bytes),
        "application/n-quads" => parse_nquads(bytes),
        "application/rdf+xml" => parse_rdfxml(bytes, base_iri),
        other => Err(QuiltError::UpstreamError {
            status: 415,
            message: format!("unsupported upstream content type: {other}"),
        }),
    }
}

fn quad_as_triple(q: &Quad) -> RioTriple<'_> {
    RioTriple {
        subject: subject_as_rio(&q.subject),
        predicate: RioNamedNode { iri: q.predicate.as_str() },
        object: term_as_rio(&q.object),
    }
}

fn subject_as_rio(s: &Subject) -> RioSubject<'_> {
    match s {
        Subject::NamedNode(n) => RioSubject::NamedNode(RioNamedNode { iri: n.as_str() }),
        Subject::BlankNode(b) => RioSubject::BlankNode(RioBlankNode { id: b.as_str() }),
    }
}

fn term_as_rio(t: &Term) -> RioTerm<'_> {
    match t {
        Term::NamedNode(n) => RioTerm::NamedNode(RioNamedNode { iri: n.as_str() }),
        Term::BlankNode(b) => RioTerm::BlankNode(RioBlankNode { id: b.as_str() }),
        Term::Literal(lit) => {
            if let Some(lang) = lit.language() {
                RioTerm::Literal(RioLiteral::LanguageTaggedString {
                    value: lit.value(),
                    language: lang,
                })
            } else if lit.datatype().as_str() == "http://www.w3.org/2001/XMLSchema#string" {
                RioTerm::Literal(RioLiteral::Simple { value: lit.value() })
            } else {
                RioTerm::Literal(RioLiteral::Typed {
                    value: lit.value(),
                    datatype: RioNamedNode { iri: lit.datatype().as_str() },
                })
            }
        }
    }
}

/// Serialises every quad in `model` as Turtle, with `prefixes` emitted
/// as `@prefix` declarations (spec §4.11).
pub fn serialize_turtle(model: &Model, prefixes: &[(String, String)]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (prefix, iri) in prefixes {
        out.extend_from_slice(format!("@prefix {prefix}: <{iri}> .\n").as_bytes());
    }
    let mut formatter = TurtleFormatter::new(&mut out);
    for quad in model.quads() {
        formatter
            .format(&quad_as_triple(quad))
            .map_err(|e| QuiltError::internal(format!("Turtle serialise error: {e}")))?;
    }
    formatter
        .finish()
        .map_err(|e| QuiltError::internal(format!("Turtle serialise error: {e}")))?;
    Ok(out)
}

/// N-Triples (default-graph quads only).
pub fn serialize_ntriples(model: &Model) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for quad in model.quads() {
        let t = quad_as_triple(quad);
        let line = format!(
            "{} <{}> {} .\n",
            term_to_ntriples(&rio_subject_as_term(&t.subject)),
            t.predicate.iri,
            term_to_ntriples(&t.object)
        );
        out.extend_from_slice(line.as_bytes());
    }
    Ok(out)
}

fn rio_subject_as_term<'a>(s: &RioSubject<'a>) -> RioTerm<'a> {
    match s {
        RioSubject::NamedNode(n) => RioTerm::NamedNode(*n),
        RioSubject::BlankNode(b) => RioTerm::BlankNode(*b),
        RioSubject::Triple(_) => RioTerm::BlankNode(RioBlankNode { id: "_:nested" }),
    }
}

fn term_to_ntriples(t: &RioTerm<'_>) -> String {
    match t {
        RioTerm::NamedNode(n) => format!("<{}>", n.iri),
        RioTerm::BlankNode(b) => format!("_:{}", b.id),
        RioTerm::Literal(RioLiteral::Simple { value }) => format!("\"{}\"", escape_literal(value)),
        RioTerm::Literal(RioLiteral::LanguageTaggedString { value, language }) => {
            format!("\"{}\"@{}", escape_literal(value), language)
        }
        RioTerm::Literal(RioLiteral::Typed { value, datatype }) => {
            format!("\"{}\"^^<{}>", escape_literal(value), datatype.iri)
        }
        RioTerm::Triple(_) => "_:nested".to_string(),
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// N-Quads: identical shape to N-Triples but with the graph name
/// appended when present.
pub fn serialize_nquads(model: &Model) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for quad in model.quads() {
        let s = subject_as_rio(&quad.subject);
        let p = quad.predicate.as_str();
        let o = term_as_rio(&quad.object);
        let mut line = format!(
            "{} <{}> {}",
            term_to_ntriples(&rio_subject_as_term(&s)),
            p,
            term_to_ntriples(&o)
        );
        if let GraphName::NamedNode(g) = &quad.graph_name {
            line.push_str(&format!(" <{}>", g.as_str()));
        }
        line.push_str(" .\n");
        out.extend_from_slice(line.as_bytes());
    }
    Ok(out)
}

/// RDF/XML, abbreviated form delegated to `rio_xml`'s formatter.
pub fn serialize_rdfxml(model: &Model) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut formatter = rio_xml::RdfXmlFormatter::new(&mut out)
            .map_err(|e| QuiltError::internal(format!("RDF/XML serialise error: {e}")))?;
        for quad in model.quads() {
            formatter
                .format(&quad_as_triple(quad))
                .map_err(|e| QuiltError::internal(format!("RDF/XML serialise error: {e}")))?;
        }
        formatter
            .finish()
            .map_err(|e| QuiltError::internal(format!("RDF/XML serialise error: {e}")))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;
    use oxrdf::Subject;

    #[test]
    fn turtle_roundtrip_contains_triple() {
        let mut m = Model::new();
        let s = Subject::NamedNode(model::uri_node("http://example.org/thing").unwrap());
        let p = model::uri_node("http://www.w3.org/1999/02/22-rdf-syntax-ns#type").unwrap();
        let o = Term::NamedNode(model::uri_node("http://xmlns.com/foaf/0.1/Person").unwrap());
        m.add(s, p, o);
        let bytes = serialize_turtle(&m, &[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("http://example.org/thing"));
    }

    #[test]
    fn ntriples_format_is_one_line_per_quad() {
        let mut m = Model::new();
        let s = Subject::NamedNode(model::uri_node("http://example.org/thing").unwrap());
        let p = model::uri_node("http://xmlns.com/foaf/0.1/name").unwrap();
        m.add(s, p, Term::Literal(model::literal("Alice")));
        let bytes = serialize_ntriples(&m).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"Alice\""));
    }
}
