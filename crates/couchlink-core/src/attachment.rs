//! Attachment metadata and its wire codec.
//!
//! Documents only ever reference attachments as stubs: the JSON body carries
//! `{"<filename>": {"content_type": "<mime>", "stub": true}}` and the bytes
//! live at the attachment location. The codec in [`codec`] is wired into
//! [`DocumentMeta`](crate::document::DocumentMeta) with `#[serde(with)]`.

use serde::{Deserialize, Serialize};

/// Metadata for one attachment on a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttachmentDescriptor {
    /// The attachment name. This is the JSON object key, never a value field.
    pub filename: String,
    /// MIME type of the content.
    pub content_type: String,
}

impl AttachmentDescriptor {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }

    /// Always true: attachment content is never embedded in document JSON.
    pub const fn is_stub(&self) -> bool {
        true
    }
}

/// The value half of one `_attachments` entry.
#[derive(Debug, Serialize, Deserialize)]
struct StubBody {
    #[serde(default)]
    content_type: String,
    #[serde(default = "stub_default")]
    stub: bool,
}

fn stub_default() -> bool {
    true
}

/// Serde codec mapping `Vec<AttachmentDescriptor>` to and from the keyed
/// `_attachments` object.
pub mod codec {
    use std::collections::HashSet;

    use super::{AttachmentDescriptor, StubBody};
    use serde::ser::{Error, SerializeMap};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    /// Write attachments as an object keyed by filename. An empty list is `{}`.
    ///
    /// Filenames are keys, so a repeated filename is an error.
    pub fn serialize<S>(attachments: &[AttachmentDescriptor], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seen = HashSet::with_capacity(attachments.len());
        if let Some(duplicate) = attachments
            .iter()
            .find(|attachment| !seen.insert(attachment.filename.as_str()))
        {
            return Err(S::Error::custom(format!(
                "duplicate attachment filename: {}",
                duplicate.filename
            )));
        }

        let mut map = serializer.serialize_map(Some(attachments.len()))?;
        for attachment in attachments {
            map.serialize_entry(
                &attachment.filename,
                &StubBody {
                    content_type: attachment.content_type.clone(),
                    stub: true,
                },
            )?;
        }
        map.end()
    }

    /// Read the keyed object back into a list, in key order.
    ///
    /// `null`, arrays and scalars decode to an empty list; so do entries
    /// whose value is not an object.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<AttachmentDescriptor>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(from_value(value))
    }

    /// Lenient conversion used by [`deserialize`].
    pub fn from_value(value: Value) -> Vec<AttachmentDescriptor> {
        let Value::Object(entries) = value else {
            return Vec::new();
        };

        entries
            .into_iter()
            .filter_map(|(filename, body)| {
                let body: StubBody = serde_json::from_value(body).ok()?;
                Some(AttachmentDescriptor {
                    filename,
                    content_type: body.content_type,
                })
            })
            .collect()
    }
}
