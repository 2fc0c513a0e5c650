//! Shared setup for integration tests.

#![allow(dead_code)]

use couchlink::http::HttpRequest;
use serde_json::Value;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// The `keys` array of a POSTed `{"keys": [...]}` body.
pub fn sent_keys(request: &HttpRequest) -> Value {
    serde_json::from_str::<Value>(&request.body_text())
        .map(|body| body["keys"].clone())
        .unwrap_or(Value::Null)
}
