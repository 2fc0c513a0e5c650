//! Timed operation events.
//!
//! Each document or view operation holds an [`EventTimer`] for its duration.
//! Dropping the timer emits one `debug` record with the elapsed time, on
//! every exit path.

use std::time::Instant;

use couchlink_core::ViewParameters;
use tracing::debug;

/// Emits a timing record when dropped.
#[must_use = "the event is logged when the timer is dropped"]
pub struct EventTimer {
    event: String,
    details: String,
    start: Instant,
}

impl EventTimer {
    pub fn start(event: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            details: details.into(),
            start: Instant::now(),
        }
    }

    /// A document action such as `get`, `create`, `update` or `bulk`.
    pub fn document(document_id: &str, action: &str) -> Self {
        Self::start(action, document_id)
    }

    /// A view query, named `design/view` with the query string as details.
    pub fn view(parameters: &ViewParameters) -> Self {
        Self::start(
            format!("{}/{}", parameters.design_document, parameters.view_name),
            parameters.query_string(),
        )
    }
}

impl Drop for EventTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        debug!(
            event = %self.event,
            details = %self.details,
            duration_ms = elapsed.as_millis() as u64,
            "couch event"
        );
    }
}
