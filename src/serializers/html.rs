//! HTML Serialiser (spec §4.9, C9): builds a JSON-shaped dictionary from
//! the model and renders it through the template engine, following the
//! same "build a dict, hand it to the template" shape as
//! `serialisers/html/html.c` / `dict.c`.

use std::collections::BTreeMap;

use oxrdf::{Subject, Term};
use serde_json::{json, Map, Value};

use crate::canon::Projection;
use crate::config::Config;
use crate::error::{QuiltError, Result};
use crate::model::Model;
use crate::request::Request;
use crate::template::Environment;

/// The sibling-serialiser facts the `links` field needs (spec §4.9):
/// everything else about a [`crate::registry::SerializerEntry`] is
/// irrelevant to alternate-format link rendering.
#[derive(Clone)]
pub struct SiblingFormat {
    pub mime: String,
    pub extension: String,
    pub description: String,
}

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
const DCT_DESCRIPTION: &str = "http://purl.org/dc/terms/description";
const GEO_LONG: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#long";
const GEO_LAT: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#lat";

/// One row of the configured `rdf:type` → CSS class table (`html:class`
/// config lines, `classURI|cssClass|label|suffix|definite`).
struct ClassEntry {
    class_uri: String,
    css_class: String,
    label: String,
    suffix: String,
    definite: bool,
}

fn load_class_table(config: &Config) -> Vec<ClassEntry> {
    config
        .get_all("html", "class")
        .iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() < 3 {
                return None;
            }
            Some(ClassEntry {
                class_uri: fields[0].to_string(),
                css_class: fields[1].to_string(),
                label: fields[2].to_string(),
                suffix: fields.get(3).copied().unwrap_or("").to_string(),
                definite: fields.get(4).copied() == Some("1"),
            })
        })
        .collect()
}

fn match_class<'a>(table: &'a [ClassEntry], types: &[String]) -> Option<&'a ClassEntry> {
    table.iter().find(|entry| types.iter().any(|t| t == &entry.class_uri))
}

/// Renders the negotiated HTML response for `req` against `model`,
/// picking a template per spec §4.9's fallback chain.
pub fn serialize(
    req: &Request,
    model: &Model,
    siblings: &[SiblingFormat],
    config: &Config,
    templates: &Environment,
) -> Result<Vec<u8>> {
    let dict = build_dict(req, model, siblings, config);

    let candidates: Vec<&str> = if req.status != 200 {
        vec!["error", "home", "index", "item"]
    } else if req.home {
        vec!["home", "index", "item"]
    } else if req.index {
        vec!["index", "item"]
    } else {
        vec!["item"]
    };

    for name in candidates {
        if templates.has(name) {
            return templates.apply(name, &dict).map(String::into_bytes);
        }
    }
    Err(QuiltError::SerializerMissing("no html template available".to_string()))
}

fn build_dict(req: &Request, model: &Model, siblings: &[SiblingFormat], config: &Config) -> Value {
    let base_url = req.base.clone();
    let class_table = load_class_table(config);
    let prefixes = config.section_entries("namespaces");

    let package = json!({
        "name": "quilt",
        "version": env!("CARGO_PKG_VERSION"),
    });

    let document_path = if req.home {
        "/index".to_string()
    } else {
        req.path.clone()
    };
    let request = json!({
        "path": req.path,
        "document": document_path,
        "method": req.received_method,
        "type": req.negotiated_mime,
        "referer": req.referer,
        "useragent": req.user_agent,
        "status": req.status,
    });

    let links = build_links(req, siblings);
    let data = build_data(model, &base_url, &prefixes, &class_table);

    let primary = req.canon.to_string_with(Projection::SUBJECT | Projection::FRAGMENT);
    let (object, title) = primary_entry(&data, &primary, &req.canon);

    json!({
        "package": package,
        "request": request,
        "links": links,
        "data": data,
        "object": object,
        "title": title,
    })
}

/// Alternate-format links: every visible serialiser whose shortest
/// extension is ≤6 chars and isn't the currently negotiated MIME (spec
/// §4.9), in registration order.
fn build_links(req: &Request, siblings: &[SiblingFormat]) -> Value {
    let current = req.negotiated_mime.as_deref().unwrap_or("");
    let links: Vec<Value> = siblings
        .iter()
        .filter(|s| !s.mime.eq_ignore_ascii_case(current))
        .filter(|s| s.extension.len() <= 6)
        .map(|s| {
            let href = req
                .canon
                .to_string_with(Projection::ABSOLUTE | Projection::FORCEEXT);
            json!({
                "mime": s.mime,
                "ext": s.extension,
                "description": s.description,
                "href": href,
            })
        })
        .collect();
    Value::Array(links)
}

fn build_data(
    model: &Model,
    base_url: &str,
    prefixes: &[(String, String)],
    class_table: &[ClassEntry],
) -> Map<String, Value> {
    let mut order: Vec<String> = Vec::new();
    let mut by_subject: BTreeMap<String, &Subject> = BTreeMap::new();
    for q in model.quads() {
        let key = subject_key(&q.subject);
        if !by_subject.contains_key(&key) {
            order.push(key.clone());
            by_subject.insert(key, &q.subject);
        }
    }

    let mut data = Map::new();
    for key in order {
        let subject = by_subject[&key];
        let entry = build_subject_entry(model, subject, base_url, prefixes, class_table);
        data.insert(key, entry);
    }
    data
}

fn subject_key(s: &Subject) -> String {
    match s {
        Subject::NamedNode(n) => n.as_str().to_string(),
        Subject::BlankNode(b) => format!("_:{}", b.as_str()),
    }
}

fn contract_uri(uri: &str, base_url: &str, prefixes: &[(String, String)]) -> String {
    if let Some(rest) = uri.strip_prefix(base_url) {
        return format!("/{}", rest.trim_start_matches('/'));
    }
    for (prefix, ns) in prefixes {
        if let Some(rest) = uri.strip_prefix(ns.as_str()) {
            return format!("{prefix}:{rest}");
        }
    }
    uri.to_string()
}

fn build_subject_entry(
    model: &Model,
    subject: &Subject,
    base_url: &str,
    prefixes: &[(String, String)],
    class_table: &[ClassEntry],
) -> Value {
    let uri = subject_key(subject);
    let quads: Vec<_> = model.quads_for_subject(subject).collect();

    let types: Vec<String> = quads
        .iter()
        .filter(|q| q.predicate.as_str() == RDF_TYPE)
        .filter_map(|q| match &q.object {
            Term::NamedNode(n) => Some(n.as_str().to_string()),
            _ => None,
        })
        .collect();

    let title = best_language_literal(&quads, RDFS_LABEL);
    let shortdesc = best_language_literal(&quads, RDFS_COMMENT);
    let description = best_language_literal(&quads, DCT_DESCRIPTION);

    let class = match_class(class_table, &types).map(|c| {
        json!({
            "class": c.css_class,
            "label": c.label,
            "suffix": c.suffix,
            "definite": c.definite,
        })
    });

    let geo = geo_position(&quads);

    let mut props: Map<String, Value> = Map::new();
    for q in &quads {
        if q.predicate.as_str() == RDF_TYPE {
            continue;
        }
        let pred_uri = q.predicate.as_str().to_string();
        let pred_key = contract_uri(&pred_uri, base_url, prefixes);
        let mut entry = term_to_prop_value(&q.object, base_url, prefixes);
        if let Value::Object(obj) = &mut entry {
            obj.insert("predicateUri".to_string(), Value::String(pred_uri.clone()));
            obj.insert("predicateUriLabel".to_string(), Value::String(pred_key.clone()));
        }
        match props.entry(pred_key) {
            serde_json::map::Entry::Occupied(mut o) => {
                if let Value::Array(arr) = o.get_mut() {
                    arr.push(entry);
                }
            }
            serde_json::map::Entry::Vacant(v) => {
                v.insert(Value::Array(vec![entry]));
            }
        }
    }

    json!({
        "subject": uri,
        "uri": contract_uri(&uri, base_url, prefixes),
        "link": contract_uri(&uri, base_url, prefixes),
        "title": title,
        "shortdesc": shortdesc,
        "description": description,
        "class": class,
        "geo": geo,
        "props": props,
    })
}

/// Language negotiation for dictionary display fields: `en-GB` beats
/// `en` beats no language (spec §4.9).
fn best_language_literal(quads: &[&oxrdf::Quad], predicate: &str) -> Option<String> {
    let mut plain = None;
    let mut en = None;
    let mut en_gb = None;
    for q in quads {
        if q.predicate.as_str() != predicate {
            continue;
        }
        if let Term::Literal(lit) = &q.object {
            match lit.language() {
                Some("en-GB") => en_gb = Some(lit.value().to_string()),
                Some("en") => en = Some(lit.value().to_string()),
                None => plain = plain.or_else(|| Some(lit.value().to_string())),
                _ => {}
            }
        }
    }
    en_gb.or(en).or(plain)
}

fn geo_position(quads: &[&oxrdf::Quad]) -> Option<Value> {
    let long = quads
        .iter()
        .find(|q| q.predicate.as_str() == GEO_LONG)
        .and_then(|q| match &q.object {
            Term::Literal(lit) => lit.value().parse::<f64>().ok(),
            _ => None,
        });
    let lat = quads
        .iter()
        .find(|q| q.predicate.as_str() == GEO_LAT)
        .and_then(|q| match &q.object {
            Term::Literal(lit) => lit.value().parse::<f64>().ok(),
            _ => None,
        });
    match (long, lat) {
        (Some(long), Some(lat)) => Some(json!({ "geo": { "long": long, "lat": lat } })),
        _ => None,
    }
}

fn term_to_prop_value(term: &Term, base_url: &str, prefixes: &[(String, String)]) -> Value {
    match term {
        Term::NamedNode(n) => json!({
            "type": "uri",
            "value": n.as_str(),
            "uri": contract_uri(n.as_str(), base_url, prefixes),
            "link": contract_uri(n.as_str(), base_url, prefixes),
        }),
        Term::BlankNode(b) => json!({
            "type": "uri",
            "value": format!("_:{}", b.as_str()),
        }),
        Term::Literal(lit) => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), Value::String("literal".to_string()));
            obj.insert("value".to_string(), Value::String(lit.value().to_string()));
            if let Some(lang) = lit.language() {
                obj.insert("lang".to_string(), Value::String(lang.to_string()));
            } else if !lit.is_plain() {
                obj.insert("datatype".to_string(), Value::String(lit.datatype().as_str().to_string()));
                obj.insert(
                    "datatypeUri".to_string(),
                    Value::String(contract_uri(lit.datatype().as_str(), base_url, prefixes)),
                );
            }
            Value::Object(obj)
        }
    }
}

/// Locates the `object`/`title` fields: the primary-topic subject, found
/// by matching the request's canonical URI under SUBJECT|FRAGMENT or
/// ABSTRACT projections (spec §4.9).
fn primary_entry(data: &Map<String, Value>, subject_form: &str, canon: &crate::canon::Canon) -> (Value, Value) {
    if let Some(entry) = data.get(subject_form) {
        let title = entry.get("title").cloned().unwrap_or(Value::Null);
        return (entry.clone(), title);
    }
    let abstract_form = canon.to_string_with(Projection::ABSTRACT);
    if let Some(entry) = data.get(&abstract_form) {
        let title = entry.get("title").cloned().unwrap_or(Value::Null);
        return (entry.clone(), title);
    }
    (Value::Null, Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;

    fn sample_model() -> Model {
        let mut m = Model::new();
        let s = Subject::NamedNode(model::uri_node("http://example.org/thing").unwrap());
        let label = model::uri_node(RDFS_LABEL).unwrap();
        m.add(s.clone(), label, Term::Literal(model::literal_lang("Thing", "en").unwrap()));
        m
    }

    #[test]
    fn data_dictionary_contains_title_for_subject() {
        let m = sample_model();
        let data = build_data(&m, "http://example.org/", &[], &[]);
        let entry = data.get("http://example.org/thing").unwrap();
        assert_eq!(entry.get("title").unwrap(), &Value::String("Thing".to_string()));
    }

    #[test]
    fn class_table_matches_rdf_type() {
        let table = vec![ClassEntry {
            class_uri: "http://xmlns.com/foaf/0.1/Person".to_string(),
            css_class: "person".to_string(),
            label: "Person".to_string(),
            suffix: "".to_string(),
            definite: false,
        }];
        let types = vec!["http://xmlns.com/foaf/0.1/Person".to_string()];
        assert!(match_class(&table, &types).is_some());
    }
}
