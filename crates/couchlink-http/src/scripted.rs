//! A client that replays queued responses and records every request.
//!
//! Clones share one queue and one log, so a test can keep a handle after
//! moving the client into the code under test.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, TransportError};
use crate::message::{HttpRequest, HttpResponse};
use crate::traits::HttpClient;

#[derive(Default)]
struct Script {
    responses: VecDeque<std::result::Result<HttpResponse, String>>,
    requests: Vec<HttpRequest>,
    timeout: Option<Duration>,
    authorization: Option<String>,
}

/// Replays responses in FIFO order.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response.
    pub fn push(&self, response: HttpResponse) -> &Self {
        self.script.lock().responses.push_back(Ok(response));
        self
    }

    /// Queue a connection failure.
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.script.lock().responses.push_back(Err(message.into()));
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().requests.len()
    }

    /// Responses queued but not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().responses.len()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.script.lock().timeout
    }

    pub fn authorization(&self) -> Option<String> {
        self.script.lock().authorization.clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut script = self.script.lock();
        let next = script.responses.pop_front();
        let method = request.method.to_string();
        let url = request.url.clone();
        script.requests.push(request);

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Connection(message)),
            None => Err(TransportError::Exhausted { method, url }),
        }
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.script.lock().timeout = Some(timeout);
    }

    fn set_authorization(&mut self, value: String) {
        self.script.lock().authorization = Some(value);
    }
}
