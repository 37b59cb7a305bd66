//! End-to-end pipeline tests driven through the public API directly
//! (no subprocess), using the `file` engine so nothing needs a live
//! SPARQL endpoint.

use std::path::Path;
use std::sync::Arc;

use quilt::adapter::{self, Adapter};
use quilt::config::Config;
use quilt::error::Result;
use quilt::registry::Registry;
use quilt::request::RawEnv;
use quilt::template::Environment;
use quilt::{engines, serializers};

/// Captures whatever an [`Adapter`] writes, the way a real front-end
/// would render it, so assertions can inspect status/headers/body.
#[derive(Default)]
struct CapturingAdapter {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    body_started: bool,
}

impl CapturingAdapter {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl Adapter for CapturingAdapter {
    fn getenv(&self, _name: &str) -> Option<String> {
        None
    }

    fn getparam(&self, _name: &str) -> Option<String> {
        None
    }

    fn getparam_multi(&self, _name: &str) -> Option<Vec<String>> {
        None
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.body_started = true;
        self.body.extend_from_slice(bytes);
        Ok(())
    }

    fn header(&mut self, line: &[u8]) -> Result<()> {
        assert!(!self.body_started, "header written after body started");
        let text = String::from_utf8_lossy(line);
        let (name, value) = text.split_once(':').expect("header line has a colon");
        if name.eq_ignore_ascii_case("status") {
            let code = value.trim().split_whitespace().next().unwrap();
            self.status = code.parse().unwrap();
        } else {
            self.headers.push((name.trim().to_string(), value.trim().to_string()));
        }
        Ok(())
    }
}

fn templates_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// Builds a registry+config pair backed by the `file` engine over a
/// temporary directory of Turtle fixtures.
fn setup(root: &Path) -> (Arc<Config>, Registry, Arc<Environment>) {
    let mut config = Config::defaults();
    config.set("quilt", "engine", "file");
    config.set("quilt", "base", "http://example.org");
    config.set("file", "root", root.to_str().unwrap());
    config.set("namespaces", "foaf", "http://xmlns.com/foaf/0.1/");
    let config = Arc::new(config);

    let templates = Arc::new(Environment::new());
    templates.load_dir(&templates_dir()).unwrap();

    let mut registry = Registry::new();
    engines::register_configured(&mut registry, &config).unwrap();
    serializers::register_all(&mut registry, &config, &templates);

    (config, registry, templates)
}

fn write_fixture(root: &Path, relative: &str, turtle: &str) {
    let path = root.join(format!("{relative}.ttl"));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, turtle).unwrap();
}

fn env(path: &str, accept: &str) -> RawEnv {
    RawEnv {
        request_uri: path.to_string(),
        method: "GET".to_string(),
        accept: accept.to_string(),
        host: None,
        user_agent: None,
        referer: None,
        ident: None,
        remote_addr: None,
    }
}

#[test]
fn turtle_extension_negotiates_ttl_regardless_of_accept() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        dir.path(),
        "thing",
        "@prefix foaf: <http://xmlns.com/foaf/0.1/> .\n\
         <http://example.org/thing> foaf:name \"Thing\" .\n",
    );
    let (config, registry, templates) = setup(dir.path());

    let mut out = CapturingAdapter::default();
    adapter::run(&registry, &config, &templates, env("/thing.ttl", "application/json"), &mut out).unwrap();

    assert_eq!(out.status, 200);
    assert_eq!(out.header("Content-Type"), Some("text/turtle"));
    let body = String::from_utf8_lossy(&out.body);
    assert!(body.contains("@prefix foaf:"));
    assert!(body.contains("\"Thing\""));
}

#[test]
fn accept_header_negotiates_without_an_extension() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        dir.path(),
        "thing",
        "<http://example.org/thing> <http://www.w3.org/2000/01/rdf-schema#label> \"A Thing\" .\n",
    );
    let (config, registry, templates) = setup(dir.path());

    let mut out = CapturingAdapter::default();
    adapter::run(&registry, &config, &templates, env("/thing", "application/ld+json"), &mut out).unwrap();

    assert_eq!(out.status, 200);
    assert_eq!(out.header("Content-Type"), Some("application/ld+json"));
    let body: serde_json::Value = serde_json::from_slice(&out.body).unwrap();
    assert!(body.is_object() || body.is_array());
}

#[test]
fn missing_resource_is_404_and_renders_the_error_template() {
    let dir = tempfile::tempdir().unwrap();
    let (config, registry, templates) = setup(dir.path());

    let mut out = CapturingAdapter::default();
    adapter::run(&registry, &config, &templates, env("/nope", "text/html"), &mut out).unwrap();

    assert_eq!(out.status, 404);
    assert_eq!(out.header("Content-Type"), Some("text/html"));
    assert!(String::from_utf8_lossy(&out.body).contains("404"));
}

#[test]
fn unacceptable_type_is_406() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "thing", "<http://example.org/thing> a <http://example.org/Thing> .\n");
    let (config, registry, templates) = setup(dir.path());

    let mut out = CapturingAdapter::default();
    adapter::run(&registry, &config, &templates, env("/thing", "application/x-nonexistent"), &mut out).unwrap();

    assert_eq!(out.status, 406);
}

#[test]
fn content_location_reflects_the_negotiated_extension() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "thing", "<http://example.org/thing> a <http://example.org/Thing> .\n");
    let (config, registry, templates) = setup(dir.path());

    let mut out = CapturingAdapter::default();
    adapter::run(&registry, &config, &templates, env("/thing", "application/n-triples"), &mut out).unwrap();

    assert_eq!(out.header("Content-Location"), Some("http://example.org/thing.nt"));
}

#[test]
fn home_page_renders_html_with_a_links_listing() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        dir.path(),
        "index",
        "@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
         <http://example.org/a> rdfs:label \"A\" .\n\
         <http://example.org/b> rdfs:label \"B\" .\n",
    );
    let (config, registry, templates) = setup(dir.path());

    let mut out = CapturingAdapter::default();
    adapter::run(&registry, &config, &templates, env("/", "text/html"), &mut out).unwrap();

    assert_eq!(out.status, 200);
    let body = String::from_utf8_lossy(&out.body);
    assert!(body.contains(">A<") && body.contains(">B<"));
}

#[test]
fn bulk_mode_is_unsupported_for_the_file_engine() {
    let dir = tempfile::tempdir().unwrap();
    let (config, registry, templates) = setup(dir.path());
    let mut out = CapturingAdapter::default();
    let err = quilt::bulk::run(&registry, &config, &templates, "text/turtle", 0, 10, &mut out).unwrap_err();
    assert_eq!(err.status(), 500);
}
