//! [`HttpClient`] backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use ::reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::message::{HttpRequest, HttpResponse, Method};
use crate::traits::HttpClient;

/// A pooled `reqwest` client with a per-request timeout and auth header.
#[derive(Clone, Default)]
pub struct ReqwestClient {
    client: ::reqwest::Client,
    timeout: Option<Duration>,
    authorization: Option<String>,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing client, keeping its pool and TLS configuration.
    pub fn with_client(client: ::reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
            authorization: None,
        }
    }
}

fn method(method: Method) -> ::reqwest::Method {
    match method {
        Method::Get => ::reqwest::Method::GET,
        Method::Head => ::reqwest::Method::HEAD,
        Method::Put => ::reqwest::Method::PUT,
        Method::Post => ::reqwest::Method::POST,
        Method::Delete => ::reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self.client.request(method(request.method), &request.url);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(authorization) = &self.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::TimedOut
            } else if e.is_builder() {
                TransportError::InvalidUrl(e.to_string())
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        let mut out = HttpResponse::new(status.as_u16())
            .with_reason(status.canonical_reason().unwrap_or_default());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                out = out.with_header(name.as_str(), value);
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(out.with_body(body))
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    fn set_authorization(&mut self, value: String) {
        self.authorization = Some(value);
    }
}
