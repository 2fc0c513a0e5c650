//! # couchlink core
//!
//! Pure primitives for couchlink: the document model, the serialization
//! pipeline, and request batching.
//!
//! This crate does no I/O. Everything that touches the network lives in
//! `couchlink-http` and `couchlink`.
//!
//! ## Key Types
//!
//! - [`Document`] - Implemented by every stored type, usually via [`impl_document!`]
//! - [`DocumentMeta`] - `_id`, `_rev`, `_attachments`, `_deleted` and `type`
//! - [`RevisionToken`] - Opaque optimistic-concurrency stamp
//! - [`Codec`] - JSON encode/decode with `$type` tagging and caller overrides
//! - [`TypeRegistry`] - Maps `$type` tags back to concrete document types
//! - [`split`] - Lazy, order-preserving chunking of id lists
//!
//! ## Wire Shape
//!
//! ```json
//! {"$type": "app::Invoice", "_id": "...", "_rev": "...",
//!  "_attachments": {"scan.pdf": {"content_type": "application/pdf", "stub": true}},
//!  "_deleted": false, "type": "Invoice", "...": "..."}
//! ```

pub mod attachment;
pub mod batch;
pub mod changes;
pub mod codec;
pub mod document;
pub mod error;
pub mod registry;
pub mod results;
pub mod types;
pub mod validation;
pub mod view;

pub use attachment::AttachmentDescriptor;
pub use batch::{split, Blocks, DEFAULT_MAX_DOCUMENTS_PER_REQUEST};
pub use changes::{Change, ChangeRevision, ChangesParameters, ChangesResult};
pub use codec::{Codec, Converter, SerializationStrategy, SerializerSettings, SettingsGuard};
pub use document::{AnyDocument, Document, DocumentMeta};
pub use error::{CoreError, Result, ValidationError};
pub use registry::{TypeRegistry, TYPE_TAG};
pub use results::{
    AllDocsValue, AttachmentContent, BulkOperationResult, PagedResult, ReplicationTask,
    UpdateResponse, ViewResult, ViewRow,
};
pub use types::RevisionToken;
pub use view::{KeyParameter, ViewParameters};
