//! Error taxonomy for the request pipeline (spec §7).
//!
//! Every variant carries the HTTP status it surfaces as; the pipeline
//! and serialisers consult [`QuiltError::status`] rather than matching
//! on variants directly so that new error kinds stay wired to a status
//! automatically.

use thiserror::Error;

/// The crate's error type. Maps 1:1 onto the taxonomy table in spec §7.
#[derive(Debug, Error)]
pub enum QuiltError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not acceptable")]
    NotAcceptable,

    #[error("not found")]
    NotFound,

    #[error("upstream error: {status} {message}")]
    UpstreamError { status: u16, message: String },

    #[error("no serialiser available for {0}")]
    SerializerMissing(String),

    #[error("missing required configuration key: {0}")]
    ConfigMissing(String),

    #[error("no such engine: {0}")]
    EngineMissing(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl QuiltError {
    /// The HTTP status this error surfaces as (spec §7).
    pub fn status(&self) -> u16 {
        match self {
            QuiltError::BadRequest(_) => 400,
            QuiltError::NotAcceptable => 406,
            QuiltError::NotFound => 404,
            QuiltError::UpstreamError { status, .. } => *status,
            QuiltError::SerializerMissing(_) => 406,
            // config/engine-missing are startup-sanity failures; callers
            // that reach here mid-request still need *some* status.
            QuiltError::ConfigMissing(_) | QuiltError::EngineMissing(_) => 500,
            QuiltError::InternalError(_) => 500,
        }
    }

    /// The status line's reason phrase, used when building error pages.
    pub fn title(&self) -> &'static str {
        status_title(self.status())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        QuiltError::InternalError(msg.into())
    }
}

/// Maps a bare status code to its canonical reason phrase. Used both by
/// [`QuiltError::title`] and by engines that return a raw status (spec §4.6
/// step 6) without an accompanying `QuiltError`.
pub fn status_title(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        410 => "Gone",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

pub type Result<T> = std::result::Result<T, QuiltError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(QuiltError::NotAcceptable.status(), 406);
        assert_eq!(QuiltError::NotFound.status(), 404);
        assert_eq!(
            QuiltError::UpstreamError { status: 503, message: "down".into() }.status(),
            503
        );
    }

    #[test]
    fn unknown_status_falls_back() {
        assert_eq!(status_title(799), "Error");
    }
}
