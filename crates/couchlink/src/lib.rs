//! # couchlink
//!
//! Typed, revision-aware access to a CouchDB-style document store.
//!
//! ## Overview
//!
//! [`CouchApi`] wraps any [`HttpClient`](couchlink_http::HttpClient) and
//! provides:
//!
//! - **Writes** under optimistic concurrency: create, update (resolving the
//!   current revision when the caller has none), bulk update with conflict
//!   and partial-failure aggregation, attachment put/delete
//! - **Multi-document reads** by id, chunked sequentially by
//!   `max_documents_per_request`, and deduplicated latest-revision lookups
//! - **Reads** of single documents, attachments, views, lists and the changes feed
//!
//! Every document is encoded with a `$type` tag naming its Rust type, so
//! [`CouchApi::get_any_document`] can decode it without the caller naming
//! the type.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use couchlink::{CouchApi, CouchConfig};
//! use couchlink::core::{impl_document, DocumentMeta};
//! use couchlink::http::MemoryServer;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Invoice {
//!     #[serde(flatten)]
//!     meta: DocumentMeta,
//!     total: u64,
//! }
//! impl_document!(Invoice, meta);
//!
//! async fn example() -> couchlink::Result<()> {
//!     let config: CouchConfig = "Server=localhost;Port=5984;DatabaseName=billing".parse()?;
//!     let api = CouchApi::new(config, MemoryServer::new("billing"))?;
//!
//!     let mut invoice = Invoice { meta: DocumentMeta::default(), total: 120 };
//!     api.create_document(&mut invoice).await?;
//!
//!     invoice.total = 150;
//!     api.update_document(&mut invoice).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Nothing is retried. [`CouchError::Conflict`] and [`CouchError::Timeout`]
//! are separated out so callers can choose to re-resolve and retry.
//!
//! ## Re-exports
//!
//! - `couchlink::core` - Document model, codec, batching, wire shapes
//! - `couchlink::http` - Transport trait and the scripted and in-memory clients

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod locations;

// Operation groups, each an `impl CouchApi` block
mod attachments;
mod changes;
mod documents;
mod revision;
mod synchronizer;
mod views;

// Re-export component crates
pub use couchlink_core as core;
pub use couchlink_http as http;

pub use api::CouchApi;
pub use config::{CouchConfig, DEFAULT_TIMEOUT};
pub use error::{CouchError, HttpError, Result};
pub use events::EventTimer;
pub use fetcher::LatestRevisions;
pub use locations::Locations;

// Re-export commonly used core types
pub use couchlink_core::{
    AttachmentContent, AttachmentDescriptor, ChangesParameters, ChangesResult, Document,
    DocumentMeta, PagedResult, RevisionToken, ViewParameters, ViewResult,
};
