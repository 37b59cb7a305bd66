//! Server Adapter Contract (spec §4.12, C12), ported from
//! `libsupport/adapter.c`'s function-pointer table. Rust expresses the
//! capability set as a trait instead of a struct of function pointers;
//! the two required front-ends (`CliAdapter`, `SocketAdapter`) both
//! implement it and then drive the same [`run`] pipeline glue.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use oxhttp::model::{HeaderName, Response, Status};
use oxhttp::Server;

use crate::config::Config;
use crate::error::{status_title, QuiltError, Result};
use crate::registry::Registry;
use crate::request::{self, RawEnv};
use crate::template::Environment;

/// The capability set every front-end implements (spec §4.12).
pub trait Adapter {
    fn getenv(&self, name: &str) -> Option<String>;
    fn getparam(&self, name: &str) -> Option<String>;
    fn getparam_multi(&self, name: &str) -> Option<Vec<String>>;

    /// Writes body bytes, sending the header/body separator on first call.
    fn put(&mut self, bytes: &[u8]) -> Result<()>;

    fn vprintf(&mut self, text: &str) -> Result<()> {
        self.put(text.as_bytes())
    }

    /// Writes one header line. Must fail once the body has begun.
    fn header(&mut self, line: &[u8]) -> Result<()>;

    fn headerf(&mut self, line: &str) -> Result<()> {
        self.header(line.as_bytes())
    }

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shared response-construction glue: runs the pipeline, negotiates a
/// serialiser, and drives `adapter` through the header/body protocol
/// (spec §6 "Response headers").
pub fn run<A: Adapter>(
    registry: &Registry,
    config: &Config,
    templates: &Environment,
    env: RawEnv,
    adapter: &mut A,
) -> Result<()> {
    adapter.begin()?;

    let result = request::run(registry, config, env);
    let outcome = match result {
        Ok(req) => render_body(registry, config, templates, &req),
        Err(e) => Err(e),
    };

    match outcome {
        Ok((status, mime, content_location, body)) => {
            write_headers(adapter, status, &mime, content_location.as_deref())?;
            adapter.put(&body)?;
        }
        Err(e) => {
            let body = format!("<html><body><h1>{} {}</h1></body></html>", e.status(), e.title());
            write_headers(adapter, e.status(), "text/html; charset=utf-8", None)?;
            adapter.put(body.as_bytes())?;
        }
    }

    adapter.end()
}

fn render_body(
    registry: &Registry,
    _config: &Config,
    _templates: &Environment,
    req: &request::Request,
) -> Result<(u16, String, Option<String>, Vec<u8>)> {
    let mime = req
        .negotiated_mime
        .clone()
        .ok_or_else(|| QuiltError::internal("request completed pipeline without a negotiated type"))?;
    let entry = registry
        .find_serializer_by_mime(&mime)
        .ok_or_else(|| QuiltError::SerializerMissing(mime.clone()))?;
    let body = (entry.callback)(req, &req.model)?;
    let content_location = req.canon.to_string_with(crate::canon::Projection::CONCRETE);
    Ok((req.status, mime, Some(content_location), body))
}

fn write_headers<A: Adapter>(adapter: &mut A, status: u16, mime: &str, content_location: Option<&str>) -> Result<()> {
    adapter.headerf(&format!("Status: {status} {}", status_title(status)))?;
    adapter.headerf(&format!("Content-Type: {mime}"))?;
    if let Some(loc) = content_location {
        adapter.headerf(&format!("Content-Location: {loc}"))?;
    }
    adapter.headerf("Vary: Accept")?;
    adapter.headerf(&format!("Server: quilt/{}", env!("CARGO_PKG_VERSION")))?;
    Ok(())
}

/// A single-shot adapter that reads the process environment and writes
/// to standard output (spec §6 "CLI").
pub struct CliAdapter {
    env: BTreeMap<String, String>,
    params: BTreeMap<String, Vec<String>>,
    body_started: bool,
    out: Box<dyn Write>,
}

impl CliAdapter {
    pub fn from_process_env(query_override: Option<&str>) -> Self {
        let mut env = BTreeMap::new();
        for (key, value) in std::env::vars() {
            env.insert(key, value);
        }
        let query = query_override
            .map(str::to_string)
            .or_else(|| env.get("QUERY_STRING").cloned())
            .unwrap_or_default();
        let params = url::form_urlencoded::parse(query.as_bytes()).fold(
            BTreeMap::new(),
            |mut map: BTreeMap<String, Vec<String>>, (k, v)| {
                map.entry(k.into_owned()).or_default().push(v.into_owned());
                map
            },
        );
        CliAdapter {
            env,
            params,
            body_started: false,
            out: Box::new(io::stdout()),
        }
    }

    pub fn raw_env(&self, request_uri: &str, accept_override: Option<&str>) -> RawEnv {
        RawEnv {
            request_uri: request_uri.to_string(),
            method: "GET".to_string(),
            accept: accept_override
                .map(str::to_string)
                .or_else(|| self.getenv("HTTP_ACCEPT"))
                .unwrap_or_else(|| "text/turtle".to_string()),
            host: self.getenv("SERVER_NAME"),
            user_agent: self.getenv("HTTP_USER_AGENT"),
            referer: self.getenv("HTTP_REFERER"),
            ident: self.getenv("REMOTE_IDENT").or_else(|| self.getenv("REMOTE_USER")),
            remote_addr: self.getenv("REMOTE_ADDR"),
        }
    }
}

impl Adapter for CliAdapter {
    fn getenv(&self, name: &str) -> Option<String> {
        self.env.get(name).cloned()
    }

    fn getparam(&self, name: &str) -> Option<String> {
        self.params.get(name)?.first().cloned()
    }

    fn getparam_multi(&self, name: &str) -> Option<Vec<String>> {
        self.params.get(name).cloned()
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.body_started {
            self.out
                .write_all(b"\n")
                .map_err(|e| QuiltError::internal(format!("writing body separator: {e}")))?;
            self.body_started = true;
        }
        self.out
            .write_all(bytes)
            .map_err(|e| QuiltError::internal(format!("writing response body: {e}")))
    }

    fn header(&mut self, line: &[u8]) -> Result<()> {
        if self.body_started {
            return Err(QuiltError::internal("cannot write a header after the body has begun"));
        }
        self.out
            .write_all(line)
            .and_then(|_| self.out.write_all(b"\n"))
            .map_err(|e| QuiltError::internal(format!("writing response header: {e}")))
    }
}

/// The long-running front-end: listens on a socket, runs the pipeline
/// per connection, and closes the request (spec §4.12, §6
/// "Long-running front-end").
pub fn serve_forever(
    bind: &str,
    registry: Arc<Registry>,
    config: Arc<Config>,
    templates: Arc<Environment>,
) -> Result<()> {
    let mut server = Server::new(move |request: &mut oxhttp::model::Request| -> Response {
        let env = raw_env_from_http(request);
        let mut adapter = ResponseAdapter::default();
        match run(&registry, &config, &templates, env, &mut adapter) {
            Ok(()) => adapter.into_response(),
            Err(e) => Response::builder(Status::INTERNAL_SERVER_ERROR)
                .with_body(format!("internal error: {e}")),
        }
    });
    server.set_global_timeout(Duration::from_secs(60));
    server
        .set_server_name(concat!("quilt/", env!("CARGO_PKG_VERSION")))
        .map_err(|e| QuiltError::internal(format!("setting server name: {e}")))?;
    server
        .listen(bind)
        .map_err(|e| QuiltError::internal(format!("listen on {bind}: {e}")))
}

fn raw_env_from_http(request: &oxhttp::model::Request) -> RawEnv {
    let accept = request
        .header(&HeaderName::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("*/*")
        .to_string();
    let referer = request
        .header(&HeaderName::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let user_agent = request
        .header(&HeaderName::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let host = request
        .header(&HeaderName::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let path = request.url().path();
    let query = request.url().query().unwrap_or("");
    let request_uri = if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    };

    RawEnv {
        request_uri,
        method: request.method().as_ref().to_string(),
        accept,
        host,
        user_agent,
        referer,
        ident: None,
        remote_addr: None,
    }
}

/// Assembles an [`Adapter`]'s header/body protocol into one
/// [`oxhttp::model::Response`] for [`serve_forever`].
#[derive(Default)]
struct ResponseAdapter {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    body_started: bool,
}

impl ResponseAdapter {
    fn into_response(self) -> Response {
        let status = status_from_code(if self.status == 0 { 200 } else { self.status });
        let mut builder = Response::builder(status);
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("status") {
                continue;
            }
            let Ok(header_name) = name.parse::<HeaderName>() else {
                continue;
            };
            // Values are all generated internally (see `write_headers`) so
            // this never actually fails; the fallback just avoids an unwrap.
            builder = builder
                .with_header(header_name, value.clone())
                .unwrap_or_else(|_| Response::builder(status));
        }
        builder.with_body(self.body)
    }
}

/// `status_title`'s counterpart for the handful of codes the pipeline
/// and its error taxonomy actually produce.
fn status_from_code(code: u16) -> Status {
    match code {
        200 => Status::OK,
        201 => Status::CREATED,
        204 => Status::NO_CONTENT,
        301 => Status::MOVED_PERMANENTLY,
        302 => Status::FOUND,
        304 => Status::NOT_MODIFIED,
        400 => Status::BAD_REQUEST,
        401 => Status::UNAUTHORIZED,
        403 => Status::FORBIDDEN,
        404 => Status::NOT_FOUND,
        405 => Status::METHOD_NOT_ALLOWED,
        406 => Status::NOT_ACCEPTABLE,
        410 => Status::GONE,
        501 => Status::NOT_IMPLEMENTED,
        502 => Status::BAD_GATEWAY,
        503 => Status::SERVICE_UNAVAILABLE,
        _ => Status::INTERNAL_SERVER_ERROR,
    }
}

impl Adapter for ResponseAdapter {
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
        if self.body_started {
            return Err(QuiltError::internal("cannot write a header after the body has begun"));
        }
        let text = String::from_utf8_lossy(line);
        if let Some((name, value)) = text.split_once(':') {
            if name.eq_ignore_ascii_case("status") {
                if let Some(code) = value.trim().split_whitespace().next() {
                    self.status = code.parse().unwrap_or(200);
                }
                return Ok(());
            }
            self.headers.push((name.trim().to_string(), value.trim().to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_adapter_rejects_header_after_body() {
        let mut a = ResponseAdapter::default();
        a.put(b"hi").unwrap();
        assert!(a.header(b"Content-Type: text/plain").is_err());
    }

    #[test]
    fn response_adapter_parses_status_header() {
        let mut a = ResponseAdapter::default();
        a.header(b"Status: 404 Not Found").unwrap();
        assert_eq!(a.status, 404);
    }
}
