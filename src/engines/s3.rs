//! S3-backed engine (spec §4.7, SPEC_FULL §2.3).
//!
//! Mirrors the `file` engine's shape but fetches bytes from an HTTP GET
//! against a configured bucket endpoint instead of the filesystem,
//! propagating the upstream status on anything but 200. Full S3
//! request-signature correctness is out of scope (S3 object fetching is
//! itself a named external-collaborator concern, spec §1); this engine
//! issues a best-effort GET, optionally with HTTP basic auth from
//! `s3:access`/`s3:secret`.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use oxhttp::model::{Method, Request as HttpRequest};
use oxhttp::Client;

use crate::config::Config;
use crate::error::{QuiltError, Result};
use crate::registry::EngineFn;
use crate::request::Request;
use crate::serializers::rdf;

pub fn build(config: &Config) -> Result<EngineFn> {
    let endpoint = config.required("s3", "endpoint")?.to_string();
    let bucket = config.required("coref", "bucket")?.to_string();
    let access = config.get("s3", "access").map(str::to_string);
    let secret = config.get("s3", "secret").map(str::to_string);
    let verbose = config.get_bool("s3", "verbose", false);

    Ok(super::arc_engine(move |req: &mut Request| -> Result<u16> {
        let key = req.path.trim_start_matches('/');
        let url_str = format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key);
        if verbose {
            tracing::debug!(url = %url_str, "fetching S3-backed resource");
        }
        let url = url_str
            .parse()
            .map_err(|e| QuiltError::internal(format!("invalid S3 URL: {e}")))?;
        let mut builder = HttpRequest::builder(Method::GET, url);
        if let (Some(a), Some(s)) = (&access, &secret) {
            let credentials = base64_basic_auth(a, s);
            builder = builder.header(oxhttp::model::HeaderName::AUTHORIZATION, credentials);
        }
        let request = builder.body(Vec::new());

        let client = Client::new().with_global_timeout(Duration::from_secs(30));
        let mut response = client
            .request(request)
            .map_err(|e| QuiltError::UpstreamError {
                status: 502,
                message: e.to_string(),
            })?;
        let status = u16::from(response.status());
        if status != 200 {
            return Ok(status);
        }
        let content_type = response
            .header(&oxhttp::model::HeaderName::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/turtle")
            .to_string();
        let mut body = Vec::new();
        std::io::Read::read_to_end(response.body_mut(), &mut body)
            .map_err(|e| QuiltError::internal(e.to_string()))?;

        let model = rdf::parse_bytes(&body, &content_type, &req.absolute_uri())?;
        req.model.merge(model);
        Ok(200)
    }))
}

fn base64_basic_auth(access: &str, secret: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{access}:{secret}")))
}
