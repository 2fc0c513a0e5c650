//! Test fixtures and helpers.
//!
//! Sample document types and a client wired to an in-memory server.

use couchlink::{CouchApi, CouchConfig};
use couchlink_core::{impl_document, AttachmentDescriptor, DocumentMeta, TypeRegistry};
use couchlink_http::{MemoryServer, ScriptedClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Database name used by every fixture.
pub const DATABASE: &str = "fixtures";

/// A customer, also embedded inside [`Invoice`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Customer {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}
impl_document!(Customer, meta);

/// An invoice with a nested customer document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub number: String,
    pub total: u64,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub lines: Vec<String>,
}
impl_document!(Invoice, meta);

impl Invoice {
    /// An unsaved invoice.
    pub fn new(id: &str, total: u64) -> Self {
        Self {
            meta: DocumentMeta::with_id(id),
            number: format!("INV-{id}"),
            total,
            customer: None,
            lines: Vec::new(),
        }
    }

    pub fn with_customer(mut self, name: &str) -> Self {
        self.customer = Some(Customer {
            meta: DocumentMeta::with_id(format!("customer-{name}")),
            name: name.to_string(),
            email: None,
        });
        self
    }

    pub fn with_attachment(mut self, filename: &str, content_type: &str) -> Self {
        self.meta
            .attachments
            .push(AttachmentDescriptor::new(filename, content_type));
        self
    }
}

/// Register the fixture types with the global type registry.
pub fn register_types() {
    let registry = TypeRegistry::global();
    registry.register::<Invoice>();
    registry.register::<Customer>();
}

/// Client configuration pointing at the fixture database.
pub fn config() -> CouchConfig {
    CouchConfig::new("couch.test", DATABASE).with_credentials("admin", "secret")
}

/// A client over a [`MemoryServer`], with a handle to the server kept for
/// seeding and inspection.
pub struct TestFixture {
    pub server: MemoryServer,
    pub api: CouchApi<MemoryServer>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    /// A fixture whose multi-document reads use blocks of `max` ids.
    pub fn with_max_documents_per_request(max: usize) -> Self {
        Self::with_config(config().with_max_documents_per_request(max))
    }

    fn with_config(config: CouchConfig) -> Self {
        register_types();
        let server = MemoryServer::new(DATABASE);
        let api = CouchApi::new(config, server.clone()).expect("fixture config is valid");
        Self { server, api }
    }

    /// Store an invoice directly on the server, tagged as the client would
    /// tag it. Returns its revision.
    pub fn seed_invoice(&self, id: &str, total: u64) -> String {
        self.server.insert_document(id, invoice_json(id, total))
    }

    /// Seed `count` invoices `inv-0 .. inv-{count-1}` and return their ids.
    pub fn seed_invoices(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                let id = format!("inv-{i}");
                self.seed_invoice(&id, i as u64 * 10);
                id
            })
            .collect()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A client over a [`ScriptedClient`], for exact request assertions.
pub fn scripted(max_documents_per_request: usize) -> (ScriptedClient, CouchApi<ScriptedClient>) {
    let client = ScriptedClient::new();
    let config = config().with_max_documents_per_request(max_documents_per_request);
    let api = CouchApi::new(config, client.clone()).expect("fixture config is valid");
    (client, api)
}

/// The stored JSON of an invoice, with its `$type` tag.
pub fn invoice_json(id: &str, total: u64) -> Value {
    json!({
        "$type": std::any::type_name::<Invoice>(),
        "_id": id,
        "type": "Invoice",
        "number": format!("INV-{id}"),
        "total": total,
        "lines": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchlink_core::Document;

    #[tokio::test]
    async fn test_fixture_round_trip() {
        let fixture = TestFixture::new();
        let rev = fixture.seed_invoice("inv-1", 50);

        let invoice: Invoice = fixture.api.get_document("inv-1").await.unwrap();
        assert_eq!(invoice.total, 50);
        assert_eq!(invoice.meta.rev.as_deref(), Some(rev.as_str()));
    }

    #[test]
    fn test_seed_invoices() {
        let fixture = TestFixture::new();
        let ids = fixture.seed_invoices(3);
        assert_eq!(ids, vec!["inv-0", "inv-1", "inv-2"]);
        assert_eq!(fixture.server.document_count(), 3);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Invoice::simple_type_name(), "Invoice");
        assert!(Invoice::qualified_type_name().ends_with("fixtures::Invoice"));
    }

    #[test]
    fn test_config_is_pushed_into_transport() {
        let (client, _api) = scripted(10);
        assert_eq!(client.authorization().as_deref(), Some("Basic YWRtaW46c2VjcmV0"));
        assert_eq!(client.timeout(), Some(couchlink::DEFAULT_TIMEOUT));
    }
}
