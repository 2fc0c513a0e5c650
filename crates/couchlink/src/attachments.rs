//! Attachment content.
//!
//! Writes always resolve the document's current revision first and address
//! the attachment at that revision.

use bytes::Bytes;
use couchlink_core::validation::require_non_empty;
use couchlink_core::{AttachmentContent, RevisionToken, UpdateResponse};
use couchlink_http::{HttpClient, HttpClientExt, HttpRequest, HttpResponse};

use crate::api::CouchApi;
use crate::error::{ensure_success, Result};
use crate::events::EventTimer;

impl<C: HttpClient> CouchApi<C> {
    pub async fn attachment_exists(&self, document_id: &str, name: &str) -> Result<bool> {
        require_non_empty(document_id, "document_id")?;
        require_non_empty(name, "attachment_name")?;

        let response = self
            .client
            .head(&self.locations.attachment(document_id, name))
            .await?;
        Ok(response.is_success())
    }

    pub async fn get_attachment(&self, document_id: &str, name: &str) -> Result<AttachmentContent> {
        require_non_empty(document_id, "document_id")?;
        require_non_empty(name, "attachment_name")?;
        let _event = EventTimer::document(document_id, "get_attachment");

        let response = self
            .send_ok(HttpRequest::get(self.locations.attachment(document_id, name)))
            .await?;
        Ok(content(response))
    }

    /// Any non-success status reads as `None`.
    pub async fn try_get_attachment(
        &self,
        document_id: &str,
        name: &str,
    ) -> Result<Option<AttachmentContent>> {
        require_non_empty(document_id, "document_id")?;
        require_non_empty(name, "attachment_name")?;
        let _event = EventTimer::document(document_id, "get_attachment");

        let response = self
            .client
            .get(&self.locations.attachment(document_id, name))
            .await?;
        Ok(response.is_success().then(|| content(response)))
    }

    /// Upload attachment content. Returns the document's new revision.
    pub async fn put_attachment(
        &self,
        document_id: &str,
        name: &str,
        data: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<RevisionToken> {
        require_non_empty(document_id, "document_id")?;
        require_non_empty(name, "attachment_name")?;
        require_non_empty(content_type, "content_type")?;
        let _event = EventTimer::document(document_id, "put_attachment");

        let rev = self.resolve_revision(document_id).await?;
        let url = self.locations.attachment_at(document_id, name, &rev);
        let response = ensure_success(self.client.put_content(&url, data.into(), content_type).await?)?;
        let update: UpdateResponse = self.decode(&response)?;
        Ok(RevisionToken::new(update.rev))
    }

    /// Remove an attachment. Returns the document's new revision.
    pub async fn delete_attachment(&self, document_id: &str, name: &str) -> Result<RevisionToken> {
        require_non_empty(document_id, "document_id")?;
        require_non_empty(name, "attachment_name")?;
        let _event = EventTimer::document(document_id, "delete_attachment");

        let rev = self.resolve_revision(document_id).await?;
        let url = self.locations.attachment_at(document_id, name, &rev);
        let response = ensure_success(self.client.delete(&url).await?)?;
        let update: UpdateResponse = self.decode(&response)?;
        Ok(RevisionToken::new(update.rev))
    }
}

fn content(response: HttpResponse) -> AttachmentContent {
    AttachmentContent {
        content_type: response.content_type().map(str::to_string),
        data: response.body.to_vec(),
    }
}
