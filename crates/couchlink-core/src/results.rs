//! Response bodies returned by the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a `_bulk_docs` response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkOperationResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BulkOperationResult {
    /// Error code `conflict`: the supplied revision was stale.
    pub fn is_conflict(&self) -> bool {
        self.error.as_deref() == Some("conflict")
    }

    /// Any non-empty error code.
    pub fn is_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// Body of a successful single-document PUT, POST or DELETE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResponse {
    #[serde(default)]
    pub id: String,
    pub rev: String,
}

/// A view (or `_all_docs`) response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>, V: Deserialize<'de>"))]
pub struct ViewResult<D, V = Value> {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub rows: Vec<ViewRow<D, V>>,
}

/// One row of a view response.
///
/// `_all_docs` rows for unknown keys carry `error` and no `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>, V: Deserialize<'de>"))]
pub struct ViewRow<D, V = Value> {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub value: Option<V>,
    /// Present when the view ran with `include_docs=true`. `null` reads as `None`.
    #[serde(default)]
    pub doc: Option<D>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The value half of an `_all_docs` row: the winning revision.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllDocsValue {
    #[serde(default)]
    pub rev: String,
    #[serde(default)]
    pub deleted: bool,
}

/// A page of view documents together with the unpaged row count.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult<T> {
    pub rows: Vec<T>,
    pub total_rows: u64,
}

impl<T> PagedResult<T> {
    pub fn new(rows: Vec<T>, total_rows: u64) -> Self {
        Self { rows, total_rows }
    }
}

/// Raw attachment content with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentContent {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// An entry of `/_active_tasks` whose type is `replication`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplicationTask {
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(rename = "pid", default)]
    pub process_id: String,
    #[serde(default, deserialize_with = "sequence::lenient")]
    pub checkpointed_source_seq: String,
    #[serde(default)]
    pub continuous: bool,
    #[serde(rename = "doc_id", default)]
    pub document_id: Option<String>,
    #[serde(rename = "doc_write_failures", default)]
    pub document_write_failures: u64,
    #[serde(rename = "docs_read", default)]
    pub documents_read: u64,
    #[serde(rename = "docs_written", default)]
    pub documents_written: u64,
    #[serde(default)]
    pub missing_revisions_found: u64,
    #[serde(default)]
    pub progress: u64,
    #[serde(default)]
    pub replication_id: String,
    #[serde(default)]
    pub revisions_checked: u64,
    #[serde(default)]
    pub source: String,
    #[serde(default, deserialize_with = "sequence::lenient")]
    pub source_seq: String,
    #[serde(default)]
    pub started_on: u64,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub updated_on: u64,
}

impl ReplicationTask {
    pub const TASK_TYPE: &'static str = "replication";
}

/// Sequence values are numbers on older servers and strings on newer ones.
pub(crate) mod sequence {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn lenient<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_result_flags() {
        let rows: Vec<BulkOperationResult> = serde_json::from_value(json!([
            { "id": "a", "ok": true, "rev": "1-x" },
            { "id": "b", "error": "conflict", "reason": "Document update conflict." },
            { "id": "c", "error": "forbidden", "reason": "no" },
            { "id": "d", "error": "" }
        ]))
        .unwrap();

        assert!(!rows[0].is_error());
        assert!(rows[1].is_conflict() && rows[1].is_error());
        assert!(!rows[2].is_conflict() && rows[2].is_error());
        assert!(!rows[3].is_error());
    }

    #[test]
    fn test_all_docs_rows() {
        let result: ViewResult<Value, AllDocsValue> = serde_json::from_value(json!({
            "total_rows": 10,
            "offset": 0,
            "rows": [
                { "id": "a", "key": "a", "value": { "rev": "2-b" }, "doc": { "_id": "a" } },
                { "key": "zz", "error": "not_found" },
                { "id": "c", "key": "c", "value": { "rev": "3-d", "deleted": true }, "doc": null }
            ]
        }))
        .unwrap();

        assert_eq!(result.total_rows, 10);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0].value.as_ref().unwrap().rev, "2-b");
        assert!(result.rows[0].doc.is_some());
        assert_eq!(result.rows[1].error.as_deref(), Some("not_found"));
        assert!(result.rows[1].id.is_none());
        assert!(result.rows[2].value.as_ref().unwrap().deleted);
        assert!(result.rows[2].doc.is_none());
    }

    #[test]
    fn test_replication_task_sequences() {
        let task: ReplicationTask = serde_json::from_value(json!({
            "type": "replication",
            "pid": "<0.1.0>",
            "checkpointed_source_seq": 42,
            "source_seq": "57-g1AAAA",
            "continuous": true,
            "docs_written": 5
        }))
        .unwrap();

        assert_eq!(task.task_type, ReplicationTask::TASK_TYPE);
        assert_eq!(task.checkpointed_source_seq, "42");
        assert_eq!(task.source_seq, "57-g1AAAA");
        assert_eq!(task.documents_written, 5);
    }
}
