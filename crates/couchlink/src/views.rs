//! View and list queries.

use couchlink_core::{PagedResult, ViewParameters, ViewResult};
use couchlink_http::{HttpClient, HttpRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::{CouchApi, KeysBody};
use crate::error::Result;
use crate::events::EventTimer;

impl<C: HttpClient> CouchApi<C> {
    /// Run a view or list and decode the raw response.
    ///
    /// Parameters with `keys` are sent as a POST body, anything else as a GET.
    pub async fn get_list_result<R: DeserializeOwned>(&self, parameters: &ViewParameters) -> Result<R> {
        let _event = EventTimer::view(parameters);

        let url = self.locations.view(parameters);
        let request = match &parameters.keys {
            Some(keys) => HttpRequest::post(url).with_json(self.codec.encode(&KeysBody { keys })?),
            None => HttpRequest::get(url),
        };
        let response = self.send_ok(request).await?;
        self.decode(&response)
    }

    /// Row values only. Documents are never included.
    pub async fn get_view_rows<V: DeserializeOwned>(&self, parameters: &ViewParameters) -> Result<Vec<V>> {
        let mut parameters = parameters.clone();
        parameters.include_docs = Some(false);

        let result: ViewResult<Value, V> = self.get_list_result(&parameters).await?;
        Ok(result.rows.into_iter().filter_map(|row| row.value).collect())
    }

    /// Included documents of every row that carries one.
    pub async fn get_view_documents<D: DeserializeOwned>(&self, parameters: &ViewParameters) -> Result<Vec<D>> {
        let result: ViewResult<D, Value> = self.get_list_result(parameters).await?;
        Ok(result.rows.into_iter().filter_map(|row| row.doc).collect())
    }

    pub async fn get_view_document_ids(&self, parameters: &ViewParameters) -> Result<Vec<String>> {
        let mut parameters = parameters.clone();
        parameters.include_docs = Some(false);

        let result: ViewResult<Value, Value> = self.get_list_result(&parameters).await?;
        Ok(result.rows.into_iter().filter_map(|row| row.id).collect())
    }

    /// One page of documents plus the unpaged row count.
    ///
    /// The view must define a count-style reduce. The page runs with
    /// `reduce=false`; the count runs with `reduce=true` and without skip,
    /// limit or documents.
    pub async fn get_paged_view_documents<D: DeserializeOwned>(
        &self,
        parameters: &ViewParameters,
    ) -> Result<PagedResult<D>> {
        let mut page = parameters.clone();
        page.reduce = Some(false);
        let rows = self.get_view_documents(&page).await?;

        let mut count = parameters.clone();
        count.reduce = Some(true);
        count.skip = None;
        count.limit = None;
        count.include_docs = Some(false);
        let counted: ViewResult<Value, u64> = self.get_list_result(&count).await?;
        let total_rows = counted.rows.first().and_then(|row| row.value).unwrap_or(0);

        Ok(PagedResult::new(rows, total_rows))
    }
}
