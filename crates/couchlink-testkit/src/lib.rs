//! # couchlink testkit
//!
//! Testing utilities for couchlink.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Sample document types and a client pre-wired to an in-memory server
//! - **Responses**: Canned store responses for exact request/response scripting
//! - **Generators**: Proptest strategies for ids, revisions, attachments and documents
//!
//! ## Test Fixtures
//!
//! ```rust
//! use couchlink_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.seed_invoice("inv-1", 120);
//! assert_eq!(fixture.server.document_count(), 1);
//! ```
//!
//! ## Scripted Responses
//!
//! ```rust
//! use couchlink_testkit::fixtures::scripted;
//! use couchlink_testkit::responses;
//!
//! let (client, _api) = scripted(500);
//! client.push(responses::etag("3-abc")).push(responses::updated("doc", "4-def"));
//! assert_eq!(client.remaining(), 2);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use couchlink_testkit::fixtures::Invoice;
//!
//! proptest! {
//!     #[test]
//!     fn invoice_round_trips(invoice: Invoice) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod responses;

pub use fixtures::{invoice_json, register_types, scripted, Customer, Invoice, TestFixture};
pub use generators::{document_id, id_list_with_duplicates, revision};
