//! The HTTP client seam.
//!
//! The client library never opens connections itself. It hands every request
//! to an [`HttpClient`], which owns pooling, TLS and the timeout.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::message::{HttpRequest, HttpResponse};

/// Async interface to an HTTP transport.
///
/// Error statuses are returned as responses, not errors. [`TransportError`]
/// is reserved for requests that produced no response at all.
///
/// [`TransportError`]: crate::TransportError
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send one request and return its full response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Set the timeout applied to every subsequent request.
    fn set_timeout(&mut self, timeout: Duration);

    /// Set the `Authorization` header value sent with every subsequent request.
    fn set_authorization(&mut self, value: String);
}

/// Verb shorthands over [`HttpClient::send`].
#[async_trait]
pub trait HttpClientExt: HttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::get(url)).await
    }

    async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::head(url)).await
    }

    async fn delete(&self, url: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::delete(url)).await
    }

    /// PUT a JSON body.
    async fn put_json(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse> {
        self.send(HttpRequest::put(url).with_json(body)).await
    }

    /// POST a JSON body.
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse> {
        self.send(HttpRequest::post(url).with_json(body)).await
    }

    /// PUT raw content with its MIME type.
    async fn put_content(&self, url: &str, body: Bytes, content_type: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::put(url).with_body(body, content_type))
            .await
    }
}

impl<T: HttpClient + ?Sized> HttpClientExt for T {}
