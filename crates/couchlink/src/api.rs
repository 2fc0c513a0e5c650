//! The client facade.
//!
//! [`CouchApi`] owns the transport, the codec and the database locations.
//! Its operations are spread over several modules, one `impl` block each:
//! revision resolution, the synchronizer, the multi-document fetcher,
//! document and attachment reads, views, and the changes feed.

use couchlink_core::{Codec, Converter, ReplicationTask, SerializerSettings, SettingsGuard};
use couchlink_http::{HttpClient, HttpClientExt, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::CouchConfig;
use crate::error::{ensure_success, Result};
use crate::locations::Locations;

/// Body of every `{"keys": [...]}` request.
#[derive(Serialize)]
pub(crate) struct KeysBody<'a, K> {
    pub keys: &'a [K],
}

/// A typed client for one database.
///
/// Holds no per-call state apart from the codec's settings override; see
/// [`CouchApi::custom_settings`].
pub struct CouchApi<C: HttpClient> {
    pub(crate) client: C,
    pub(crate) codec: Codec,
    pub(crate) locations: Locations,
    pub(crate) config: CouchConfig,
}

impl<C: HttpClient> CouchApi<C> {
    /// Create a client. The timeout and basic-auth header are pushed into
    /// the transport once, here.
    pub fn new(config: CouchConfig, client: C) -> Result<Self> {
        Self::with_codec(config, client, Codec::new())
    }

    /// Create a client with a preconfigured codec, e.g. one built with a
    /// [`SerializationStrategy`](couchlink_core::SerializationStrategy).
    pub fn with_codec(config: CouchConfig, mut client: C, codec: Codec) -> Result<Self> {
        config.validate()?;
        client.set_timeout(config.timeout);
        client.set_authorization(config.basic_auth());

        let locations = Locations::new(config.server_url(), config.database.clone());
        debug!(database = %config.database, server = %config.server_url(), "couch client ready");

        Ok(Self {
            client,
            codec,
            locations,
            config,
        })
    }

    pub fn config(&self) -> &CouchConfig {
        &self.config
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn locations(&self) -> &Locations {
        &self.locations
    }

    pub fn max_documents_per_request(&self) -> usize {
        self.config.max_documents_per_request
    }

    pub fn set_max_documents_per_request(&mut self, max: usize) -> Result<()> {
        couchlink_core::validation::require_at_least(max, 1, "max_documents_per_request")?;
        self.config.max_documents_per_request = max;
        Ok(())
    }

    /// Add a converter applied to every subsequent encode and decode.
    pub fn add_converter(&self, converter: impl Converter + 'static) {
        self.codec.add_converter(converter);
    }

    pub fn clear_converters(&self) {
        self.codec.clear_converters();
    }

    /// Override serializer settings until the returned guard is dropped.
    ///
    /// Not safe to combine with concurrent calls on the same client that
    /// expect default settings.
    pub fn custom_settings<F>(&self, changes: F) -> SettingsGuard<'_>
    where
        F: Fn(&mut SerializerSettings) + Send + Sync + 'static,
    {
        self.codec.custom_settings(changes)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Server
    // ─────────────────────────────────────────────────────────────────────────

    /// Fail unless the database answers a GET with success.
    pub async fn check_connection(&self) -> Result<()> {
        self.send_ok(HttpRequest::get(self.locations.database()))
            .await
            .map(|_| ())
    }

    /// Replication tasks currently running on the server.
    pub async fn get_active_replication_tasks(&self) -> Result<Vec<ReplicationTask>> {
        let response = self
            .send_ok(HttpRequest::get(self.locations.active_tasks()))
            .await?;
        let tasks: Vec<Value> = self.decode(&response)?;

        tasks
            .into_iter()
            .filter(|task| task.get("type").and_then(Value::as_str) == Some(ReplicationTask::TASK_TYPE))
            .map(|task| Ok(serde_json::from_value(task)?))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request plumbing
    // ─────────────────────────────────────────────────────────────────────────

    /// Send and classify any non-success response.
    pub(crate) async fn send_ok(&self, request: HttpRequest) -> Result<HttpResponse> {
        ensure_success(self.client.send(request).await?)
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self, response: &HttpResponse) -> Result<T> {
        Ok(self.codec.decode(&response.body)?)
    }

    /// POST `{"keys": [...]}` and decode the response.
    pub(crate) async fn post_keys<R, K>(&self, url: String, keys: &[K]) -> Result<R>
    where
        R: DeserializeOwned,
        K: Serialize + Sync,
    {
        let body = self.codec.encode(&KeysBody { keys })?;
        let response = ensure_success(self.client.post_json(&url, body).await?)?;
        self.decode(&response)
    }
}
