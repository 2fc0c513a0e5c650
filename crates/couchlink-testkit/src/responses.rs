//! Canned store responses for [`ScriptedClient`](couchlink_http::ScriptedClient).

use couchlink_http::HttpResponse;
use serde_json::{json, Value};

/// A successful HEAD probe carrying `rev` as a quoted ETag.
pub fn etag(rev: &str) -> HttpResponse {
    HttpResponse::new(200).with_header("ETag", format!("\"{rev}\""))
}

/// `201 {"ok":true,"id":..,"rev":..}`.
pub fn updated(id: &str, rev: &str) -> HttpResponse {
    HttpResponse::json(201, &json!({ "ok": true, "id": id, "rev": rev }))
}

/// `409` document update conflict.
pub fn conflict() -> HttpResponse {
    HttpResponse::json(
        409,
        &json!({ "error": "conflict", "reason": "Document update conflict." }),
    )
}

pub fn not_found() -> HttpResponse {
    HttpResponse::json(404, &json!({ "error": "not_found", "reason": "missing" }))
}

/// One `_bulk_docs` entry.
#[derive(Debug, Clone)]
pub enum BulkEntry<'a> {
    Ok { id: &'a str, rev: &'a str },
    Error { id: &'a str, error: &'a str, reason: &'a str },
}

/// A `_bulk_docs` response.
pub fn bulk(entries: &[BulkEntry<'_>]) -> HttpResponse {
    let body: Vec<Value> = entries
        .iter()
        .map(|entry| match entry {
            BulkEntry::Ok { id, rev } => json!({ "ok": true, "id": id, "rev": rev }),
            BulkEntry::Error { id, error, reason } => {
                json!({ "id": id, "error": error, "reason": reason })
            }
        })
        .collect();
    HttpResponse::json(201, &Value::Array(body))
}

/// An `_all_docs?include_docs=true` response with one row per document.
pub fn all_docs(documents: &[Value]) -> HttpResponse {
    let rows: Vec<Value> = documents
        .iter()
        .map(|doc| {
            json!({
                "id": doc["_id"],
                "key": doc["_id"],
                "value": { "rev": doc.get("_rev").cloned().unwrap_or_else(|| json!("1-0")) },
                "doc": doc,
            })
        })
        .collect();
    HttpResponse::json(200, &json!({ "total_rows": rows.len(), "offset": 0, "rows": rows }))
}

/// An `_all_docs` revision response. `None` revisions become not-found rows.
pub fn revisions(entries: &[(&str, Option<&str>)]) -> HttpResponse {
    let rows: Vec<Value> = entries
        .iter()
        .map(|(id, rev)| match rev {
            Some(rev) => json!({ "id": id, "key": id, "value": { "rev": rev } }),
            None => json!({ "key": id, "error": "not_found" }),
        })
        .collect();
    HttpResponse::json(200, &json!({ "rows": rows }))
}
