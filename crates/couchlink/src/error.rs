//! Error types for the client.

use couchlink_core::{CoreError, ValidationError};
use couchlink_http::{HttpResponse, TransportError};
use thiserror::Error;

/// A non-success response, kept for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status} {reason} {body}")]
pub struct HttpError {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

/// Errors that can occur during client operations.
///
/// Nothing is retried internally. `Conflict` and `Timeout` exist so callers
/// can decide whether to re-resolve and retry.
#[derive(Debug, Error)]
pub enum CouchError {
    /// A required argument was empty. Raised before any request is sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The store rejected one or more writes because their revision was stale.
    #[error("document update conflict: {}", .ids.join(", "))]
    Conflict { ids: Vec<String> },

    /// A non-success response whose body reports a timeout.
    #[error("request timed out: {status} {body}")]
    Timeout { status: u16, body: String },

    /// Any other non-success response.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Per-document failures aggregated from a bulk request.
    #[error("bulk request failed: {0}")]
    Request(String),

    /// Encode or decode failed.
    #[error(transparent)]
    Serialization(#[from] CoreError),

    /// No response was produced.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl CouchError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CouchError::Conflict { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CouchError::Timeout { .. })
    }

    /// The response status, for errors built from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            CouchError::Timeout { status, .. } => Some(*status),
            CouchError::Http(e) => Some(e.status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CouchError {
    fn from(e: serde_json::Error) -> Self {
        CouchError::Serialization(e.into())
    }
}

/// Turn a non-success response into an error.
///
/// A body mentioning "timeout" in any case becomes [`CouchError::Timeout`]:
/// the store reports timeouts as ordinary error bodies, not a distinct status.
pub(crate) fn classify(response: &HttpResponse) -> CouchError {
    let body = response.body_text();
    if body.to_lowercase().contains("timeout") {
        CouchError::Timeout {
            status: response.status,
            body,
        }
    } else {
        CouchError::Http(HttpError {
            status: response.status,
            reason: response.reason.clone(),
            body,
        })
    }
}

/// Pass a success response through; classify anything else.
pub(crate) fn ensure_success(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(classify(&response))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, CouchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_sniffing_is_case_insensitive() {
        let response = HttpResponse::new(500).with_body("{\"error\":\"os_process_TiMeOUt\"}");
        let err = ensure_success(response).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_http_error_message() {
        let response = HttpResponse::new(500).with_body("nonsense");
        let err = ensure_success(response).unwrap_err();
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "500 Internal Server Error nonsense");
    }

    #[test]
    fn test_success_passes_through() {
        let response = HttpResponse::new(201).with_body("{}");
        assert_eq!(ensure_success(response).unwrap().status, 201);
    }

    #[test]
    fn test_conflict_message_joins_ids() {
        let err = CouchError::Conflict {
            ids: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "document update conflict: a, b");
        assert!(err.is_conflict());
    }
}
