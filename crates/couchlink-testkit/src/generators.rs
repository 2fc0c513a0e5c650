//! Proptest generators for property-based testing.

use proptest::prelude::*;

use couchlink_core::{AttachmentDescriptor, DocumentMeta};

use crate::fixtures::{Customer, Invoice};

/// Generate a document id.
pub fn document_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,23}".prop_map(String::from)
}

/// Generate a revision token in the store's `{generation}-{hash}` shape.
pub fn revision() -> impl Strategy<Value = String> {
    (1u32..1000, "[a-f0-9]{32}").prop_map(|(generation, hash)| format!("{generation}-{hash}"))
}

/// Generate a list of ids drawn from a small pool, so duplicates are common.
pub fn id_list_with_duplicates(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(0u8..8, 0..=max_len)
        .prop_map(|picks| picks.into_iter().map(|i| format!("doc-{i}")).collect())
}

/// Generate a MIME type.
pub fn content_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("application/pdf".to_string()),
        Just("image/png".to_string()),
        Just("text/plain".to_string()),
        Just("application/octet-stream".to_string()),
    ]
}

/// Generate attachment stubs with distinct filenames.
pub fn attachments(max: usize) -> impl Strategy<Value = Vec<AttachmentDescriptor>> {
    prop::collection::btree_map("[a-z]{1,8}\\.[a-z]{3}", content_type(), 0..=max).prop_map(
        |files| {
            files
                .into_iter()
                .map(|(filename, content_type)| AttachmentDescriptor::new(filename, content_type))
                .collect()
        },
    )
}

/// Generate document metadata as the store would hand it back.
pub fn document_meta() -> impl Strategy<Value = DocumentMeta> {
    (document_id(), proptest::option::of(revision()), attachments(3)).prop_map(
        |(id, rev, attachments)| DocumentMeta {
            id,
            rev,
            attachments,
            deleted: false,
            doc_type: Some("Invoice".to_string()),
        },
    )
}

impl Arbitrary for Invoice {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            document_meta(),
            "[A-Z]{3}-[0-9]{1,6}",
            any::<u64>(),
            proptest::option::of("[A-Za-z ]{1,16}"),
            prop::collection::vec("[a-z ]{0,12}", 0..4),
        )
            .prop_map(|(meta, number, total, customer, lines)| Invoice {
                meta,
                number,
                total,
                customer: customer.map(|name| Customer {
                    meta: DocumentMeta::default(),
                    name,
                    email: None,
                }),
                lines,
            })
            .boxed()
    }
}
