//! Single-document reads.

use couchlink_core::validation::require_non_empty;
use couchlink_core::{AnyDocument, Document};
use couchlink_http::{HttpClient, HttpClientExt, HttpRequest};
use serde::de::DeserializeOwned;

use crate::api::CouchApi;
use crate::error::Result;
use crate::events::EventTimer;

impl<C: HttpClient> CouchApi<C> {
    pub async fn get_document<T: DeserializeOwned>(&self, document_id: &str) -> Result<T> {
        require_non_empty(document_id, "document_id")?;
        let _event = EventTimer::document(document_id, "get");

        let response = self
            .send_ok(HttpRequest::get(self.locations.document(document_id)))
            .await?;
        self.decode(&response)
    }

    /// A specific, possibly superseded, revision.
    pub async fn get_document_at_revision<T: DeserializeOwned>(
        &self,
        document_id: &str,
        rev: &str,
    ) -> Result<T> {
        require_non_empty(document_id, "document_id")?;
        require_non_empty(rev, "rev")?;
        let _event = EventTimer::document(document_id, "get");

        let response = self
            .send_ok(HttpRequest::get(self.locations.document_at(document_id, rev)))
            .await?;
        self.decode(&response)
    }

    /// Like [`get_document`](Self::get_document), but any non-success status
    /// reads as `None`.
    pub async fn try_get_document<T: DeserializeOwned>(&self, document_id: &str) -> Result<Option<T>> {
        require_non_empty(document_id, "document_id")?;
        let _event = EventTimer::document(document_id, "get");

        let response = self.client.get(&self.locations.document(document_id)).await?;
        if !response.is_success() {
            return Ok(None);
        }
        self.decode(&response).map(Some)
    }

    /// Decode into whichever registered type the stored `$type` tag names.
    pub async fn get_any_document(&self, document_id: &str) -> Result<Box<dyn AnyDocument>> {
        require_non_empty(document_id, "document_id")?;
        let _event = EventTimer::document(document_id, "get");

        let response = self
            .send_ok(HttpRequest::get(self.locations.document(document_id)))
            .await?;
        Ok(self.codec.decode_any(&response.body)?)
    }

    pub async fn document_exists(&self, document_id: &str) -> Result<bool> {
        require_non_empty(document_id, "document_id")?;

        let response = self.client.head(&self.locations.document(document_id)).await?;
        Ok(response.is_success())
    }

    /// An unsaved copy: no id, no revision and no attachments.
    pub fn duplicate<T: Document>(&self, document: &T) -> Result<T> {
        Ok(self.codec.duplicate(document)?)
    }
}
