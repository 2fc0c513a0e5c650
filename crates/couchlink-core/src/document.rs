//! The document model.
//!
//! Application types embed a [`DocumentMeta`] (flattened into their JSON) and
//! implement [`Document`], usually through [`impl_document!`](crate::impl_document).

use std::any::Any;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::attachment::{self, AttachmentDescriptor};
use crate::types::RevisionToken;
use crate::validation::is_blank;

/// Store-managed fields every document carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Opaque document id. Empty until assigned by the caller or by create.
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Current revision. Omitted from the wire when absent or blank.
    #[serde(rename = "_rev", default, skip_serializing_if = "rev_is_blank")]
    pub rev: Option<String>,

    /// Stub attachment metadata, encoded as an object keyed by filename.
    #[serde(rename = "_attachments", with = "attachment::codec", default)]
    pub attachments: Vec<AttachmentDescriptor>,

    #[serde(rename = "_deleted", default)]
    pub deleted: bool,

    /// Simple type name, stamped at write time.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
}

fn rev_is_blank(rev: &Option<String>) -> bool {
    is_blank(rev.as_deref())
}

impl DocumentMeta {
    /// Metadata for an unsaved document with a caller-chosen id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// True until the store has assigned a revision.
    pub fn is_new(&self) -> bool {
        is_blank(self.rev.as_deref())
    }

    /// The revision as a token, when one is known.
    pub fn revision(&self) -> Option<RevisionToken> {
        if self.is_new() {
            None
        } else {
            self.rev.clone().map(RevisionToken::new)
        }
    }

    pub fn set_revision(&mut self, rev: RevisionToken) {
        self.rev = Some(rev.into_string());
    }

    /// Metadata for a copy of this document: no id, no revision, no attachments.
    ///
    /// Attachment content lives on the server and must be re-uploaded for the copy.
    pub fn duplicate(&self) -> Self {
        Self {
            id: String::new(),
            rev: None,
            attachments: Vec::new(),
            deleted: self.deleted,
            doc_type: self.doc_type.clone(),
        }
    }
}

/// A typed document stored in the database.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn meta(&self) -> &DocumentMeta;

    fn meta_mut(&mut self) -> &mut DocumentMeta;

    /// Fully qualified type name, written into the `$type` discriminator.
    fn qualified_type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Last path segment of the type name, written into the `type` field.
    fn simple_type_name() -> &'static str
    where
        Self: Sized,
    {
        simple_name(Self::qualified_type_name())
    }

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn is_new(&self) -> bool {
        self.meta().is_new()
    }
}

/// Strip module path and generic arguments: `app::model::Page<u8>` -> `Page`.
pub fn simple_name(qualified: &str) -> &str {
    let base = qualified.split('<').next().unwrap_or(qualified);
    base.rsplit("::").next().unwrap_or(base)
}

/// Object-safe view of a document whose concrete type is only known at runtime.
pub trait AnyDocument: Send + Sync {
    fn document_meta(&self) -> &DocumentMeta;

    /// The qualified type name of the concrete document.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Document> AnyDocument for T {
    fn document_meta(&self) -> &DocumentMeta {
        Document::meta(self)
    }

    fn type_name(&self) -> &'static str {
        T::qualified_type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn AnyDocument {
    /// Borrow as the concrete type.
    pub fn downcast_ref<T: Document>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Take ownership as the concrete type.
    pub fn downcast<T: Document>(self: Box<Self>) -> Result<Box<T>, Box<dyn Any>> {
        self.into_any().downcast::<T>()
    }
}

/// Implement [`Document`] for a struct with a `DocumentMeta` field.
///
/// ```
/// use couchlink_core::{impl_document, DocumentMeta};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Note {
///     #[serde(flatten)]
///     meta: DocumentMeta,
///     body: String,
/// }
///
/// impl_document!(Note, meta);
/// ```
#[macro_export]
macro_rules! impl_document {
    ($ty:ty, $field:ident) => {
        impl $crate::Document for $ty {
            fn meta(&self) -> &$crate::DocumentMeta {
                &self.$field
            }

            fn meta_mut(&mut self) -> &mut $crate::DocumentMeta {
                &mut self.$field
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Memo {
        #[serde(flatten)]
        meta: DocumentMeta,
        text: String,
    }

    crate::impl_document!(Memo, meta);

    #[test]
    fn test_is_new() {
        let mut meta = DocumentMeta::default();
        assert!(meta.is_new());

        meta.rev = Some(String::new());
        assert!(meta.is_new());

        meta.rev = Some(" ".into());
        assert!(meta.is_new());
        assert!(meta.revision().is_none());

        meta.rev = Some("1-abc".into());
        assert!(!meta.is_new());
        assert_eq!(meta.revision().unwrap().as_str(), "1-abc");
    }

    #[test]
    fn test_type_names() {
        assert!(Memo::qualified_type_name().ends_with("document::tests::Memo"));
        assert_eq!(Memo::simple_type_name(), "Memo");
        assert_eq!(simple_name("app::Page<app::Item>"), "Page");
        assert_eq!(simple_name("Plain"), "Plain");
    }

    #[test]
    fn test_wire_shape() {
        let memo = Memo {
            meta: DocumentMeta {
                id: "memo-1".into(),
                rev: None,
                attachments: vec![],
                deleted: false,
                doc_type: Some("Memo".into()),
            },
            text: "hi".into(),
        };

        let value = serde_json::to_value(&memo).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "memo-1",
                "_attachments": {},
                "_deleted": false,
                "type": "Memo",
                "text": "hi"
            })
        );
        assert!(value.get("_rev").is_none());
    }

    #[test]
    fn test_blank_rev_is_omitted() {
        let mut memo = Memo {
            meta: DocumentMeta::with_id("memo-2"),
            text: String::new(),
        };
        memo.meta.rev = Some("  ".into());
        let value = serde_json::to_value(&memo).unwrap();
        assert!(value.get("_rev").is_none());
    }

    #[test]
    fn test_duplicate_drops_identity_and_attachments() {
        let meta = DocumentMeta {
            id: "1".into(),
            rev: Some("1-a".into()),
            attachments: vec![AttachmentDescriptor::new("f", "text/plain")],
            deleted: true,
            doc_type: Some("Memo".into()),
        };

        let copy = meta.duplicate();
        assert!(copy.id.is_empty());
        assert!(copy.is_new());
        assert!(copy.attachments.is_empty());
        assert!(copy.deleted);
    }

    #[test]
    fn test_any_document_downcast() {
        let memo = Memo {
            meta: DocumentMeta::with_id("m"),
            text: "x".into(),
        };
        let boxed: Box<dyn AnyDocument> = Box::new(memo.clone());

        assert_eq!(boxed.document_meta().id, "m");
        assert_eq!(boxed.type_name(), Memo::qualified_type_name());
        assert_eq!(boxed.downcast_ref::<Memo>(), Some(&memo));
        assert_eq!(*boxed.downcast::<Memo>().unwrap(), memo);
    }
}
