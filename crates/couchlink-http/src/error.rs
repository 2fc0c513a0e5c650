//! Error types for the transport layer.

use thiserror::Error;

/// Failures that prevented an HTTP response from being produced.
///
/// A response with an error status is not a transport error; it is returned
/// as an ordinary [`HttpResponse`](crate::HttpResponse) for the caller to classify.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the server, or the connection dropped mid-request.
    #[error("connection error: {0}")]
    Connection(String),

    /// The request URL could not be parsed or routed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The response body could not be read.
    #[error("body error: {0}")]
    Body(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    TimedOut,

    /// A scripted client received more requests than it had responses for.
    #[error("no scripted response left for {method} {url}")]
    Exhausted { method: String, url: String },
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
