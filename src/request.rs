//! Request value and Request Pipeline (spec §3 "Request", §4.6, C6).

use std::collections::BTreeMap;

use oxrdf::NamedNode;
use url::form_urlencoded;

use crate::canon::Canon;
use crate::config::Config;
use crate::error::{QuiltError, Result};
use crate::model::Model;
use crate::registry::Registry;

/// Server-enforced cap on `limit`, applied regardless of what a client
/// requests (spec §3).
pub const MAX_LIMIT: u32 = 1000;
pub const DEFAULT_LIMIT: u32 = 50;

/// A single incoming request (spec §3 "Request"). Owns its model and
/// canonical-URI builder for its lifetime; both are dropped together
/// with the request.
pub struct Request {
    pub base: String,
    pub received_method: String,
    pub received_host: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub ident: Option<String>,
    pub remote_addr: Option<String>,

    pub path: String,
    pub explicit_ext: Option<String>,
    pub query: BTreeMap<String, Vec<String>>,

    /// The verbatim request path and query string, before extension
    /// stripping, `/index` rewriting, or percent-decoding — fed to
    /// `Canon::set_user_path`/`set_user_query` for USERSUPPLIED
    /// projections (spec §4.6 step 4).
    pub raw_path: String,
    pub raw_query: String,

    pub negotiated_mime: Option<String>,
    pub negotiated_ext: Option<String>,
    pub status: u16,

    pub canon: Canon,
    pub model: Model,
    pub base_graph: Option<NamedNode>,

    pub limit: u32,
    pub offset: u32,

    pub home: bool,
    pub index: bool,
}

impl Request {
    fn new(base: &str) -> Self {
        Request {
            base: base.to_string(),
            received_method: "GET".to_string(),
            received_host: None,
            user_agent: None,
            referer: None,
            ident: None,
            remote_addr: None,
            path: "/".to_string(),
            explicit_ext: None,
            query: BTreeMap::new(),
            raw_path: "/".to_string(),
            raw_query: String::new(),
            negotiated_mime: None,
            negotiated_ext: None,
            status: 200,
            canon: Canon::new(),
            model: Model::new(),
            base_graph: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            home: false,
            index: false,
        }
    }

    /// The absolute request URI (base + path), used as the subject for
    /// the `resource-graph` engine (spec §4.7).
    pub fn absolute_uri(&self) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), self.path)
    }

    pub fn query_first(&self, key: &str) -> Option<&str> {
        self.query.get(key)?.first().map(String::as_str)
    }
}

/// Everything the adapter needs to hand the pipeline (spec §4.6 step 1,
/// ACCEPT): the environment-variable surface common to CLI/FastCGI/HTTP
/// front ends.
pub struct RawEnv {
    pub request_uri: String,
    pub method: String,
    pub accept: String,
    pub host: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub ident: Option<String>,
    pub remote_addr: Option<String>,
}

/// Runs the request pipeline (spec §4.6) to completion, returning the
/// fully populated request. Errors map to the status codes named beside
/// each pipeline stage in spec §4.6's diagram; callers hand the returned
/// `Request` (whatever its `status`) to the negotiated serialiser.
pub fn run(registry: &Registry, config: &Config, env: RawEnv) -> Result<Request> {
    let base = config.get_or("quilt", "base", "http://www.example.com/");
    let mut req = Request::new(&base);
    req.received_method = env.method;
    req.received_host = env.host;
    req.user_agent = env.user_agent;
    req.referer = env.referer;
    req.ident = env.ident;
    req.remote_addr = env.remote_addr;

    normalise_uri(&mut req, &env.request_uri)?;
    match_type(registry, &mut req, &env.accept)?;
    build_canon(registry, &mut req, config);

    let engine_name = config.required("quilt", "engine")?.to_string();
    let engine = registry
        .find_engine_by_name(&engine_name)
        .ok_or_else(|| QuiltError::EngineMissing(engine_name.clone()))?;

    let status = (engine.callback)(&mut req)?;
    req.status = if status == 0 { 200 } else { status };
    Ok(req)
}

/// Spec §4.6 step 2, NORMALISE_URI.
fn normalise_uri(req: &mut Request, raw: &str) -> Result<()> {
    if !raw.starts_with('/') {
        return Err(QuiltError::BadRequest(format!(
            "request URI must begin with '/': {raw}"
        )));
    }

    let mut rest = raw;
    // Fragments are never sent to a server by a conforming client, but
    // the pipeline still splits one off defensively.
    if let Some(idx) = rest.find('#') {
        rest = &rest[..idx];
    }

    let (path_and_ext, query) = match rest.find('?') {
        Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
        None => (rest, None),
    };

    req.raw_path = path_and_ext.to_string();
    req.raw_query = query.unwrap_or("").to_string();

    if let Some(q) = query {
        req.query = decode_query(q);
    }

    let mut path = path_and_ext.to_string();
    if let Some(dot) = path.rfind('.') {
        // A dot before the final path segment's start is not an
        // extension (e.g. "/a.b/c"); only split within the last segment.
        if path[dot..].find('/').is_none() && dot > path.rfind('/').unwrap_or(0) {
            req.explicit_ext = Some(path[dot + 1..].to_string());
            path.truncate(dot);
        }
    }
    if path.is_empty() {
        path = "/".to_string();
    }

    if path == "/index" {
        path = "/".to_string();
    }
    req.home = path == "/";
    req.index = req.home;
    req.path = path;

    req.limit = req
        .query_first("limit")
        .and_then(|v| v.parse::<u32>().ok())
        .map(|v| v.clamp(1, MAX_LIMIT))
        .unwrap_or(DEFAULT_LIMIT);
    req.offset = req
        .query_first("offset")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);

    Ok(())
}

/// Percent-decodes a `&`-separated query string into an ordered
/// multimap, preserving duplicate keys (spec §4.6 step 2).
fn decode_query(raw: &str) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        out.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    out
}

/// Spec §4.6 step 3, MATCH_TYPE.
fn match_type(registry: &Registry, req: &mut Request, accept: &str) -> Result<()> {
    if let Some(ext) = req.explicit_ext.clone() {
        let entry = registry
            .find_serializer_by_extension(&ext)
            .ok_or(QuiltError::NotAcceptable)?;
        req.negotiated_mime = Some(entry.mime.clone());
        req.negotiated_ext = entry.extensions.first().cloned();
        return Ok(());
    }

    let accept = if accept.is_empty() { "*/*" } else { accept };
    let mut negotiator = registry.negotiator().clone();
    let winner = negotiator
        .negotiate_type(accept)
        .map(str::to_string)
        .ok_or(QuiltError::NotAcceptable)?;
    let entry = registry
        .find_serializer_by_mime(&winner)
        .ok_or(QuiltError::NotAcceptable)?;
    req.negotiated_mime = Some(entry.mime.clone());
    req.negotiated_ext = entry.extensions.first().cloned();
    Ok(())
}

/// Spec §4.6 step 4, BUILD_CANON.
fn build_canon(registry: &Registry, req: &mut Request, _config: &Config) {
    req.canon.set_base(&req.base);
    req.canon.reset_path();
    for segment in req.path.split('/').filter(|s| !s.is_empty()) {
        req.canon.add_path(segment);
    }
    req.canon.set_ext(req.negotiated_ext.as_deref());
    req.canon.set_explicit_ext(req.explicit_ext.as_deref());
    if req.home {
        req.canon.set_name(Some("index"));
    }
    req.canon.set_user_path(&req.raw_path);
    req.canon.set_user_query(&req.raw_query);

    let _ = registry; // kept for symmetry with the other pipeline stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn registry_with_turtle() -> Registry {
        let mut reg = Registry::new();
        reg.register_serializer(
            "text/turtle",
            "ttl",
            "Turtle",
            1.0,
            true,
            Arc::new(|_req, _model| Ok(Vec::new())),
        );
        reg
    }

    #[test]
    fn path_normalisation_splits_last_extension_only() {
        let mut req = Request::new("http://example.org/");
        normalise_uri(&mut req, "/a.b/c.ttl?x=1").unwrap();
        assert_eq!(req.path, "/a.b/c");
        assert_eq!(req.explicit_ext.as_deref(), Some("ttl"));
        assert_eq!(req.query_first("x"), Some("1"));
    }

    #[test]
    fn index_is_equivalent_to_home() {
        let mut req = Request::new("http://example.org/");
        normalise_uri(&mut req, "/index").unwrap();
        assert!(req.home);
        assert!(req.index);
        assert_eq!(req.path, "/");
    }

    #[test]
    fn non_slash_prefixed_uri_is_bad_request() {
        let mut req = Request::new("http://example.org/");
        assert!(normalise_uri(&mut req, "thing").is_err());
    }

    #[test]
    fn match_type_by_explicit_extension() {
        let reg = registry_with_turtle();
        let mut req = Request::new("http://example.org/");
        req.explicit_ext = Some("ttl".to_string());
        match_type(&reg, &mut req, "").unwrap();
        assert_eq!(req.negotiated_mime.as_deref(), Some("text/turtle"));
    }

    #[test]
    fn match_type_406_when_no_offer() {
        let reg = registry_with_turtle();
        let mut req = Request::new("http://example.org/");
        assert!(match_type(&reg, &mut req, "application/json").is_err());
    }

    #[test]
    fn user_supplied_projection_uses_the_verbatim_raw_path_and_query() {
        let reg = registry_with_turtle();
        let mut req = Request::new("http://example.org/");
        // Unsorted, percent-encoded, and carrying its own extension —
        // USERSUPPLIED must reflect exactly what was received, unlike
        // CONCRETE's sorted/decoded/extension-negotiated form.
        normalise_uri(&mut req, "/thing.ttl?foo=2&bar=1%20x").unwrap();
        match_type(&reg, &mut req, "text/turtle").unwrap();
        build_canon(&reg, &mut req, &Config::defaults());
        let loc = req.canon.to_string_with(crate::canon::Projection::REQUEST);
        assert_eq!(loc, "http://example.org/thing.ttl?foo=2&bar=1%20x");
    }

    #[test]
    fn canon_location_sorts_params() {
        let reg = registry_with_turtle();
        let mut req = Request::new("http://example.org/");
        normalise_uri(&mut req, "/thing?foo=2&bar=1").unwrap();
        match_type(&reg, &mut req, "text/turtle").unwrap();
        build_canon(&reg, &mut req, &Config::defaults());
        let loc = req.canon.to_string_with(crate::canon::Projection::CONCRETE);
        assert_eq!(loc, "http://example.org/thing.ttl?bar=1&foo=2");
    }
}
