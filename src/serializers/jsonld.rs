//! JSON-LD Serialiser (spec §4.10, C10), ported from
//! `serialisers/jsonld/jsonld.c`'s compaction strategy.

use std::collections::{BTreeMap, HashMap};

use oxrdf::{NamedNode, Subject, Term};
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::model::Model;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// The declarative `@context`, assembled from config (spec §4.10).
pub struct JsonLdContext {
    base: Option<String>,
    /// prefix -> namespace URI
    namespaces: Vec<(String, String)>,
    /// predicate URI -> alias
    aliases_by_uri: HashMap<String, String>,
    /// alias -> predicate URI
    aliases_by_name: HashMap<String, String>,
    /// predicate URI -> datatype URI the context declares for it
    datatypes: HashMap<String, String>,
    /// predicate URI -> container ("@set" | "@list" | "@language")
    containers: HashMap<String, String>,
}

impl JsonLdContext {
    pub fn from_config(config: &Config) -> Self {
        let namespaces = config.section_entries("namespaces");
        let mut aliases_by_uri = HashMap::new();
        let mut aliases_by_name = HashMap::new();
        for (alias, predicate) in config.section_entries("jsonld:aliases") {
            aliases_by_uri.insert(predicate.clone(), alias.clone());
            aliases_by_name.insert(alias, predicate);
        }
        let datatypes = config
            .section_entries("jsonld:datatypes")
            .into_iter()
            .map(|(alias, dt)| {
                let predicate = aliases_by_name.get(&alias).cloned().unwrap_or(alias);
                (predicate, dt)
            })
            .collect();
        let containers = config
            .section_entries("jsonld:containers")
            .into_iter()
            .map(|(alias, container)| {
                let predicate = aliases_by_name.get(&alias).cloned().unwrap_or(alias);
                (predicate, container)
            })
            .collect();
        JsonLdContext {
            base: config.get("quilt", "jsonld:base").map(str::to_string),
            namespaces,
            aliases_by_uri,
            aliases_by_name,
            datatypes,
            containers,
        }
    }

    /// Renders the `@context` document object (spec §4.10).
    pub fn to_document(&self) -> Value {
        let mut obj = Map::new();
        if let Some(base) = &self.base {
            obj.insert("@base".to_string(), Value::String(base.clone()));
        }
        for (prefix, uri) in &self.namespaces {
            obj.insert(prefix.clone(), Value::String(uri.clone()));
        }
        for (alias, predicate) in &self.aliases_by_name {
            obj.insert(alias.clone(), Value::String(predicate.clone()));
        }
        obj.insert("type".to_string(), json!("@type"));
        Value::Object(obj)
    }

    fn container_for(&self, predicate: &str) -> Option<&str> {
        self.containers.get(predicate).map(String::as_str)
    }

    fn datatype_for(&self, predicate: &str) -> Option<&str> {
        self.datatypes.get(predicate).map(String::as_str)
    }

    fn predicate_is_id_typed(&self, predicate: &str) -> bool {
        predicate == RDF_TYPE
    }

    /// Strips the base, contracts against a known prefix, then aliases —
    /// in that order (spec §4.10, "URI contraction").
    pub fn contract_uri(&self, base_url: &str, uri: &str) -> String {
        if uri == RDF_TYPE {
            return "@type".to_string();
        }
        let relative = uri.strip_prefix(base_url).unwrap_or(uri);
        let relative = if relative != uri {
            format!("/{}", relative.trim_start_matches('/'))
        } else {
            relative.to_string()
        };
        let candidate = if relative != uri {
            relative
        } else {
            self.namespaces
                .iter()
                .find_map(|(prefix, ns)| uri.strip_prefix(ns.as_str()).map(|rest| format!("{prefix}:{rest}")))
                .unwrap_or_else(|| uri.to_string())
        };
        self.aliases_by_uri.get(uri).cloned().unwrap_or(candidate)
    }
}

struct SubjectEntry {
    uri: String,
    types: Vec<String>,
    props: BTreeMap<String, Vec<Value>>,
}

/// Compacts `model` into a JSON-LD document (spec §4.10).
///
/// `base_url` is the site base for URI contraction; `primary_subject`
/// (when present) enables subject-only recursive inlining up to depth 8
/// (spec §4.10's final paragraph).
pub fn serialize(
    model: &Model,
    ctx: &JsonLdContext,
    base_url: &str,
    no_named_graphs: bool,
    primary_subject: Option<&str>,
) -> Value {
    let context_value = ctx.to_document();

    let contexts = model.contexts();
    let single_graph = no_named_graphs || contexts.len() <= 1;

    let mut root = Map::new();
    root.insert("@context".to_string(), context_value);

    if single_graph {
        let set = collate_graph(model, None, ctx, base_url);
        let set = finalize_set(set, ctx, base_url, primary_subject);
        root.insert("@graph".to_string(), Value::Array(set));
    } else {
        let mut graphs = Vec::new();
        for g in &contexts {
            let set = collate_graph(model, Some(g), ctx, base_url);
            let set = finalize_set(set, ctx, base_url, primary_subject);
            graphs.push(json!({
                "@id": ctx.contract_uri(base_url, g.as_str()),
                "@graph": set,
            }));
        }
        root.insert("@graph".to_string(), Value::Array(graphs));
    }

    Value::Object(root)
}

/// Subject collation for one graph (spec §4.10, "Subject collation").
fn collate_graph(
    model: &Model,
    context: Option<&NamedNode>,
    ctx: &JsonLdContext,
    base_url: &str,
) -> Vec<SubjectEntry> {
    let quads = model.quads_in_context(context);
    let mut order: Vec<String> = Vec::new();
    let mut by_subject: HashMap<String, SubjectEntry> = HashMap::new();

    for q in quads {
        let key = q.subject.to_string();
        if !by_subject.contains_key(&key) {
            order.push(key.clone());
            by_subject.insert(
                key.clone(),
                SubjectEntry {
                    uri: subject_uri(&q.subject),
                    types: Vec::new(),
                    props: BTreeMap::new(),
                },
            );
        }
        let entry = by_subject.get_mut(&key).unwrap();
        if q.predicate.as_str() == RDF_TYPE {
            if let Term::NamedNode(t) = &q.object {
                entry.types.push(t.as_str().to_string());
            }
            continue;
        }
        let value = encode_value(ctx, base_url, q.predicate.as_str(), &q.object);
        entry
            .props
            .entry(q.predicate.as_str().to_string())
            .or_default()
            .push(value);
    }

    order
        .into_iter()
        .map(|k| by_subject.remove(&k).unwrap())
        .collect()
}

fn subject_uri(s: &Subject) -> String {
    match s {
        Subject::NamedNode(n) => n.as_str().to_string(),
        Subject::BlankNode(b) => format!("_:{}", b.as_str()),
    }
}

/// Property handling + value encoding for one entry set (spec §4.10).
fn finalize_set(
    entries: Vec<SubjectEntry>,
    ctx: &JsonLdContext,
    base_url: &str,
    primary_subject: Option<&str>,
) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for entry in entries {
        let mut obj = Map::new();
        obj.insert("@id".to_string(), Value::String(ctx.contract_uri(base_url, &entry.uri)));
        if !entry.types.is_empty() {
            let types: Vec<Value> = entry
                .types
                .iter()
                .map(|t| Value::String(ctx.contract_uri(base_url, t)))
                .collect();
            obj.insert(
                "@type".to_string(),
                if types.len() == 1 {
                    types.into_iter().next().unwrap()
                } else {
                    Value::Array(types)
                },
            );
        }

        for (predicate, values) in &entry.props {
            if values.is_empty() {
                continue;
            }
            let key = ctx.contract_uri(base_url, predicate);
            let rendered = render_property(ctx, predicate, values);
            obj.insert(key, rendered);
        }

        out.push(Value::Object(obj));
    }

    if let Some(primary) = primary_subject {
        let contracted = ctx.contract_uri(base_url, primary);
        inline_subject(&mut out, &contracted, 0);
    }

    out
}

/// Collects multi-valued properties, honouring `@container` hints
/// (spec §4.10): `@set`/`@list` always emit arrays; `@language`
/// collects literal values into a `{ lang -> value }` map.
fn render_property(ctx: &JsonLdContext, predicate: &str, values: &[Value]) -> Value {
    if ctx.container_for(predicate) == Some("@language") {
        let mut map = Map::new();
        for v in values {
            if let Value::Object(o) = v {
                if let (Some(Value::String(lang)), Some(val)) = (o.get("@language"), o.get("@value")) {
                    map.insert(lang.clone(), val.clone());
                    continue;
                }
            }
        }
        return Value::Object(map);
    }

    let force_array = matches!(ctx.container_for(predicate), Some("@set") | Some("@list"));
    let mut deduped: Vec<Value> = Vec::new();
    for v in values {
        if !deduped.contains(v) {
            deduped.push(v.clone());
        }
    }
    if deduped.len() == 1 && !force_array {
        deduped.into_iter().next().unwrap()
    } else {
        Value::Array(deduped)
    }
}

/// Value encoding (spec §4.10).
fn encode_value(ctx: &JsonLdContext, base_url: &str, predicate: &str, term: &Term) -> Value {
    match term {
        Term::NamedNode(n) => {
            if ctx.datatype_for(predicate) == Some("@id") || ctx.predicate_is_id_typed(predicate) {
                Value::String(ctx.contract_uri(base_url, n.as_str()))
            } else {
                json!({ "@id": ctx.contract_uri(base_url, n.as_str()) })
            }
        }
        Term::BlankNode(b) => json!({ "@id": format!("_:{}", b.as_str()) }),
        Term::Literal(lit) => {
            if let Some(lang) = lit.language() {
                return json!({ "@value": lit.value(), "@language": lang });
            }
            let datatype = lit.datatype().as_str();
            if datatype == XSD_BOOLEAN {
                if let Some(b) = parse_xsd_bool(lit.value()) {
                    return Value::Bool(b);
                }
            }
            if matches!(datatype, XSD_INTEGER | XSD_DOUBLE | XSD_DECIMAL) {
                if ctx.datatype_for(predicate).is_none() {
                    if datatype == XSD_INTEGER {
                        if let Ok(i) = lit.value().parse::<i64>() {
                            return Value::Number(i.into());
                        }
                    } else if let Ok(f) = lit.value().parse::<f64>() {
                        if let Some(n) = serde_json::Number::from_f64(f) {
                            return Value::Number(n);
                        }
                    }
                }
            }
            if let Some(declared) = ctx.datatype_for(predicate) {
                if declared == datatype || datatype == XSD_STRING {
                    return Value::String(lit.value().to_string());
                }
            }
            if datatype == XSD_STRING {
                return Value::String(lit.value().to_string());
            }
            json!({
                "@value": lit.value(),
                "@type": ctx.contract_uri(base_url, datatype),
            })
        }
    }
}

fn parse_xsd_bool(v: &str) -> Option<bool> {
    match v {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Subject-only mode (spec §4.10): recursively inlines any object
/// referenced by `subject_id` (already in contracted `@id` form), up to
/// depth 8, removing each inlined object from the top-level set.
fn inline_subject(set: &mut Vec<Value>, subject_id: &str, depth: u32) {
    if depth >= 8 {
        return;
    }
    let Some(pos) = set.iter().position(|v| v.get("@id") == Some(&Value::String(subject_id.to_string()))) else {
        return;
    };

    let referenced_ids: Vec<String> = {
        let Value::Object(obj) = &set[pos] else { return };
        obj.values()
            .flat_map(|v| match v {
                Value::Object(o) => o.get("@id").and_then(|id| id.as_str()).map(String::from).into_iter().collect(),
                Value::Array(a) => a
                    .iter()
                    .filter_map(|item| match item {
                        Value::Object(o) => o.get("@id").and_then(|id| id.as_str()).map(String::from),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            })
            .collect()
    };

    for id in referenced_ids {
        if id == subject_id {
            continue;
        }
        if let Some(inline_pos) = set.iter().position(|v| v.get("@id") == Some(&Value::String(id.clone()))) {
            let inlined = set.remove(inline_pos);
            let Some(pos) = set.iter().position(|v| v.get("@id") == Some(&Value::String(subject_id.to_string()))) else {
                continue;
            };
            if let Value::Object(obj) = &mut set[pos] {
                for v in obj.values_mut() {
                    replace_id_ref(v, &id, &inlined);
                }
            }
            inline_subject(set, &id, depth + 1);
        }
    }
}

fn replace_id_ref(value: &mut Value, id: &str, replacement: &Value) {
    match value {
        Value::Object(o) if o.get("@id") == Some(&Value::String(id.to_string())) && o.len() == 1 => {
            *value = replacement.clone();
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                replace_id_ref(item, id, replacement);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;

    fn ctx_with_datatype() -> JsonLdContext {
        let mut cfg = Config::default();
        cfg.set("jsonld:datatypes", "modified", "http://www.w3.org/2001/XMLSchema#dateTime");
        cfg.set("jsonld:aliases", "modified", "http://purl.org/dc/terms/modified");
        JsonLdContext::from_config(&cfg)
    }

    #[test]
    fn datatype_compaction_emits_bare_string_for_declared_type() {
        let ctx = ctx_with_datatype();
        let dt = model::uri_node("http://www.w3.org/2001/XMLSchema#dateTime").unwrap();
        let lit = model::literal_typed("2020-01-01T00:00:00Z", &dt);
        let value = encode_value(&ctx, "http://example.org/", "http://purl.org/dc/terms/modified", &Term::Literal(lit));
        assert_eq!(value, Value::String("2020-01-01T00:00:00Z".to_string()));
    }

    #[test]
    fn integer_becomes_json_number_without_context_override() {
        let ctx = JsonLdContext::from_config(&Config::default());
        let lit = model::literal_integer(42);
        let value = encode_value(&ctx, "http://example.org/", "http://example.org/count", &Term::Literal(lit));
        assert_eq!(value, json!(42));
    }

    #[test]
    fn language_container_collects_without_duplicate_languages() {
        let mut cfg = Config::default();
        cfg.set("jsonld:containers", "label", "@language");
        cfg.set("jsonld:aliases", "label", "http://www.w3.org/2000/01/rdf-schema#label");
        let ctx = JsonLdContext::from_config(&cfg);
        let values = vec![
            json!({ "@value": "hello", "@language": "en" }),
            json!({ "@value": "bonjour", "@language": "fr" }),
        ];
        let rendered = render_property(&ctx, "http://www.w3.org/2000/01/rdf-schema#label", &values);
        assert_eq!(rendered, json!({ "en": "hello", "fr": "bonjour" }));
    }
}
