//! SPARQL Client (spec §4.4, C4).
//!
//! Issues a SPARQL query over HTTP and folds the SPARQL JSON results
//! document into a [`Model`]. The transport itself (connection pooling,
//! TLS, retries) is an out-of-scope external collaborator (spec §1); this
//! module only owns the one operation the rest of the crate needs:
//! `query_to_model`.

use std::io::Cursor;
use std::time::Duration;

use oxhttp::model::{Method, Request};
use oxhttp::Client;
use oxrdf::{Subject, Term};
use sparesults::{QueryResultsFormat, QueryResultsParser, QueryResultsReader};
use url::form_urlencoded;

use crate::error::{QuiltError, Result};
use crate::model::Model;

/// A thin wrapper around the configured SPARQL query endpoint.
#[derive(Debug, Clone)]
pub struct SparqlClient {
    endpoint: String,
    verbose: bool,
}

impl SparqlClient {
    pub fn new(endpoint: impl Into<String>, verbose: bool) -> Self {
        Self {
            endpoint: endpoint.into(),
            verbose,
        }
    }

    /// Runs `query_text` against the endpoint and folds every result row
    /// into `model`. Rows are expected to project `?s, ?p, ?o` and
    /// optionally `?g`; a row without `?g` becomes a default-graph
    /// triple (spec §4.4).
    pub fn query_to_model(&self, query_text: &str, model: &mut Model) -> Result<()> {
        let body = self.execute(query_text)?;
        self.fold_results(&body, model)
    }

    fn execute(&self, query_text: &str) -> Result<Vec<u8>> {
        let encoded: String =
            form_urlencoded::Serializer::new(String::new())
                .append_pair("query", query_text)
                .finish();
        if self.verbose {
            tracing::debug!(endpoint = %self.endpoint, query = %query_text, "issuing SPARQL query");
        }
        let url = format!("{}?{}", self.endpoint, encoded)
            .parse()
            .map_err(|e| QuiltError::internal(format!("invalid SPARQL endpoint URL: {e}")))?;
        let request = Request::builder(Method::GET, url)
            .header(
                oxhttp::model::HeaderName::ACCEPT,
                "application/sparql-results+json",
            )
            .body(Vec::new());
        let client = Client::new().with_global_timeout(Duration::from_secs(60));
        let mut response = client
            .request(request)
            .map_err(|e| QuiltError::UpstreamError {
                status: 502,
                message: e.to_string(),
            })?;
        let status = u16::from(response.status());
        if !(200..300).contains(&status) {
            return Err(QuiltError::UpstreamError {
                status,
                message: format!("SPARQL endpoint returned {status}"),
            });
        }
        let mut buf = Vec::new();
        std::io::Read::read_to_end(response.body_mut(), &mut buf)
            .map_err(|e| QuiltError::UpstreamError {
                status: 502,
                message: e.to_string(),
            })?;
        Ok(buf)
    }

    /// Runs `query_text` and collects every binding of `var` as a plain
    /// string, in result order. Used by bulk enumeration (spec §6, `-b`),
    /// which needs a flat list of subject URIs rather than a model.
    pub fn query_to_list(&self, query_text: &str, var: &str) -> Result<Vec<String>> {
        let body = self.execute(query_text)?;
        let parser = QueryResultsParser::from_format(QueryResultsFormat::Json);
        let reader = parser
            .read_results(Cursor::new(body))
            .map_err(|e| QuiltError::UpstreamError {
                status: 502,
                message: format!("malformed SPARQL results: {e}"),
            })?;
        let mut out = Vec::new();
        if let QueryResultsReader::Solutions(solutions) = reader {
            for solution in solutions {
                let solution = solution.map_err(|e| QuiltError::UpstreamError {
                    status: 502,
                    message: format!("malformed SPARQL results: {e}"),
                })?;
                if let Some(term) = solution.get(var) {
                    out.push(match term {
                        Term::NamedNode(n) => n.as_str().to_string(),
                        other => other.to_string(),
                    });
                }
            }
        }
        Ok(out)
    }

    fn fold_results(&self, body: &[u8], model: &mut Model) -> Result<()> {
        let parser = QueryResultsParser::from_format(QueryResultsFormat::Json);
        let reader = parser
            .read_results(Cursor::new(body))
            .map_err(|e| QuiltError::UpstreamError {
                status: 502,
                message: format!("malformed SPARQL results: {e}"),
            })?;
        match reader {
            QueryResultsReader::Solutions(solutions) => {
                for solution in solutions {
                    let solution = solution.map_err(|e| QuiltError::UpstreamError {
                        status: 502,
                        message: format!("malformed SPARQL results: {e}"),
                    })?;
                    let Some(s) = solution.get("s") else { continue };
                    let Some(p) = solution.get("p") else { continue };
                    let Some(o) = solution.get("o") else { continue };
                    let Ok(subject) = Subject::try_from(s.clone()) else { continue };
                    let Term::NamedNode(predicate) = p.clone() else { continue };
                    let object = o.clone();
                    match solution.get("g") {
                        Some(Term::NamedNode(g)) => {
                            model.add_in_context(g.clone(), subject, predicate, object)
                        }
                        _ => model.add(subject, predicate, object),
                    }
                }
                Ok(())
            }
            QueryResultsReader::Boolean(_) => Ok(()),
        }
    }
}

/// Percent-escapes a URI for safe inclusion inside a SPARQL `FILTER`
/// clause built by string concatenation (spec §4.7, §9). The source
/// escapes only `>` as `%3e`; the spec's Open Question resolves this
/// crate to escape every URI-unsafe byte instead of hand-picking one.
pub fn escape_for_filter(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len());
    for b in uri.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' | b'/'
            | b'#' | b'?' | b'@' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+'
            | b',' | b';' | b'=' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02x}")),
        }
    }
    // '>' would terminate the IRIREF inside a FILTER(?s = <...>) clause;
    // it is always escaped even though it is otherwise a legal IRI byte.
    out.replace('>', "%3e")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_for_filter_handles_angle_bracket() {
        assert_eq!(escape_for_filter("http://example.org/a>b"), "http://example.org/a%3eb");
    }
}
