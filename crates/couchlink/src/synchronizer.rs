//! Document writes under optimistic concurrency.
//!
//! ```text
//! Unsaved ──create──▶ Saved(r1)
//! Saved(rN) ──update──▶ Saved(rN+1)
//! Saved(?) ──resolve──▶ Saved(rN) ──update──▶ Saved(rN+1)
//! any write ──stale rev──▶ Conflict (caller re-resolves and retries)
//! ```

use std::collections::HashMap;

use couchlink_core::validation::{is_blank, require_non_empty};
use couchlink_core::{BulkOperationResult, Document, UpdateResponse};
use couchlink_http::{HttpClient, HttpClientExt, HttpResponse};
use tracing::warn;
use uuid::Uuid;

use crate::api::CouchApi;
use crate::error::{ensure_success, CouchError, Result};
use crate::events::EventTimer;

/// HTTP status the store returns for a stale revision.
const CONFLICT: u16 = 409;

impl<C: HttpClient> CouchApi<C> {
    /// Store a new document.
    ///
    /// A blank id is replaced by a fresh UUID. No revision is resolved: the
    /// store rejects the write if the id is already taken.
    pub async fn create_document<T: Document>(&self, document: &mut T) -> Result<()> {
        if is_blank(Some(document.id())) {
            document.meta_mut().id = Uuid::new_v4().to_string();
        }
        let _event = EventTimer::document(document.id(), "create");

        let url = self.locations.document(document.id());
        self.write(document, url).await
    }

    /// Store a new revision of an existing document.
    ///
    /// A document without a revision has it resolved first, so the write
    /// always carries the store's current revision.
    pub async fn update_document<T: Document>(&self, document: &mut T) -> Result<()> {
        require_non_empty(document.id(), "document_id")?;
        let _event = EventTimer::document(document.id(), "update");

        let rev = match document.meta().revision() {
            Some(rev) => rev,
            None => {
                let rev = self.resolve_revision(document.id()).await?;
                document.meta_mut().set_revision(rev.clone());
                rev
            }
        };

        let url = self.locations.document_at(document.id(), rev.as_str());
        self.write(document, url).await
    }

    /// Create an empty document (`{}`) under the given id.
    pub async fn create_empty_document(&self, document_id: &str) -> Result<String> {
        require_non_empty(document_id, "document_id")?;
        let _event = EventTimer::document(document_id, "create");

        let url = self.locations.document(document_id);
        let response = self.client.put_json(&url, b"{}".to_vec()).await?;
        let update: UpdateResponse = self.decode(&write_outcome(document_id, response)?)?;
        Ok(update.rev)
    }

    /// Write many documents in one `_bulk_docs` request.
    ///
    /// Blank ids are replaced by fresh UUIDs before sending, as on create.
    /// The request is not chunked. Any conflict fails the whole call with
    /// every conflicting id, although the store has still applied the other
    /// writes. Revisions are written back only when no entry failed.
    pub async fn bulk_update<T: Document>(&self, documents: &mut [T]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        for document in documents.iter_mut() {
            if is_blank(Some(document.id())) {
                document.meta_mut().id = Uuid::new_v4().to_string();
            }
            document.meta_mut().doc_type = Some(T::simple_type_name().to_string());
        }

        let ids = documents
            .iter()
            .map(|d| d.id())
            .collect::<Vec<_>>()
            .join(",");
        let _event = EventTimer::document(&ids, "bulk");

        let body = self.codec.encode_documents(documents)?;
        let response = ensure_success(self.client.post_json(&self.locations.bulk_docs(), body).await?)?;
        let results: Vec<BulkOperationResult> = self.decode(&response)?;

        check_bulk_results(&results)?;

        let revisions: HashMap<&str, &str> = results
            .iter()
            .filter_map(|r| Some((r.id.as_str(), r.rev.as_deref()?)))
            .collect();
        for document in documents.iter_mut() {
            if let Some(rev) = revisions.get(document.id()).map(|rev| rev.to_string()) {
                document.meta_mut().rev = Some(rev);
            }
        }
        Ok(())
    }

    async fn write<T: Document>(&self, document: &mut T, url: String) -> Result<()> {
        document.meta_mut().doc_type = Some(T::simple_type_name().to_string());

        let body = self.codec.encode_document(document)?;
        let response = self.client.put_json(&url, body).await?;
        let update: UpdateResponse = self.decode(&write_outcome(document.id(), response)?)?;

        document.meta_mut().rev = Some(update.rev);
        Ok(())
    }
}

/// Map a single-document write response to success, conflict or a classified error.
fn write_outcome(document_id: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.status == CONFLICT {
        warn!(id = document_id, "document update conflict");
        return Err(CouchError::Conflict {
            ids: vec![document_id.to_string()],
        });
    }
    ensure_success(response)
}

/// Conflicts take precedence over other per-document errors.
fn check_bulk_results(results: &[BulkOperationResult]) -> Result<()> {
    let conflicts: Vec<String> = results
        .iter()
        .filter(|r| r.is_conflict())
        .map(|r| r.id.clone())
        .collect();
    if !conflicts.is_empty() {
        warn!(ids = %conflicts.join(","), "bulk update conflict");
        return Err(CouchError::Conflict { ids: conflicts });
    }

    let failures: Vec<String> = results
        .iter()
        .filter(|r| r.is_error())
        .map(|r| {
            format!(
                "id: {}, error: {}, reason: {}",
                r.id,
                r.error.as_deref().unwrap_or_default(),
                r.reason.as_deref().unwrap_or_default()
            )
        })
        .collect();
    if !failures.is_empty() {
        warn!(count = failures.len(), "bulk update failed");
        return Err(CouchError::Request(failures.join("; ")));
    }
    Ok(())
}
