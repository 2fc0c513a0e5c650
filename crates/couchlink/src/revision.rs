//! Revision resolution.

use couchlink_core::validation::require_non_empty;
use couchlink_core::RevisionToken;
use couchlink_http::{HttpClient, HttpRequest};

use crate::api::CouchApi;
use crate::error::{CouchError, HttpError, Result};

impl<C: HttpClient> CouchApi<C> {
    /// Current revision of a document, read from the ETag of a HEAD probe.
    ///
    /// Only used on write paths, where the document is expected to exist: a
    /// missing document is an error, not `None`.
    pub async fn resolve_revision(&self, document_id: &str) -> Result<RevisionToken> {
        require_non_empty(document_id, "document_id")?;

        let response = self
            .send_ok(HttpRequest::head(self.locations.document(document_id)))
            .await?;

        response
            .etag()
            .and_then(RevisionToken::from_etag)
            .ok_or_else(|| {
                CouchError::Http(HttpError {
                    status: response.status,
                    reason: response.reason.clone(),
                    body: format!("no revision in ETag for {document_id}"),
                })
            })
    }
}
