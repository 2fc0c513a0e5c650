//! The changes feed and latest-revision lookups.

use couchlink_core::validation::require_non_empty;
use couchlink_core::{AllDocsValue, ChangesParameters, ChangesResult, ViewResult};
use couchlink_http::{HttpClient, HttpRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::CouchApi;
use crate::error::Result;
use crate::events::EventTimer;

impl<C: HttpClient> CouchApi<C> {
    /// One page of the changes feed with documents decoded as `D`.
    pub async fn get_changes<D: DeserializeOwned>(
        &self,
        parameters: &ChangesParameters,
    ) -> Result<ChangesResult<D>> {
        let query = parameters.query_string();
        let _event = EventTimer::start("changes", query.clone());

        let response = self
            .send_ok(HttpRequest::get(self.locations.changes(&query)))
            .await?;
        self.decode(&response)
    }

    /// The changes feed with documents left as raw JSON.
    pub async fn get_changes_untyped(&self, parameters: &ChangesParameters) -> Result<ChangesResult<Value>> {
        self.get_changes(parameters).await
    }

    /// The winning revision of one document, or `None` when it is unknown.
    /// Deleted documents still report their tombstone revision.
    pub async fn get_latest_document_revision(&self, document_id: &str) -> Result<Option<AllDocsValue>> {
        require_non_empty(document_id, "document_id")?;
        let _event = EventTimer::document(document_id, "revision");

        let response = self
            .send_ok(HttpRequest::get(self.locations.all_docs_for(document_id)))
            .await?;
        let result: ViewResult<Value, AllDocsValue> = self.decode(&response)?;
        Ok(result
            .rows
            .into_iter()
            .next()
            .filter(|row| row.error.is_none())
            .and_then(|row| row.value))
    }
}
