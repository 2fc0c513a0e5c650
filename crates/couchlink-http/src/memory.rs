//! In-memory emulation of a CouchDB database behind the [`HttpClient`] trait.
//!
//! This is primarily for testing. It enforces the same revision rules as a
//! real server (stale or missing revisions are rejected with `409`), mints
//! revisions of the form `{generation}-{hex}`, and answers the document,
//! attachment, `_bulk_docs`, `_all_docs`, `_changes`, view and
//! `_active_tasks` endpoints the client uses.
//!
//! Views are defined with Rust closures standing in for map functions, with
//! an optional `_count` reduce.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::message::{HttpRequest, HttpResponse, Method};
use crate::traits::HttpClient;

/// A view map function: emits `(key, value)` pairs for one document.
pub type MapFn = Arc<dyn Fn(&Value) -> Vec<(Value, Value)> + Send + Sync>;

struct ViewDefinition {
    map: MapFn,
    count_reduce: bool,
}

struct StoredAttachment {
    content_type: String,
    data: Bytes,
}

struct StoredDocument {
    rev: String,
    generation: u64,
    seq: u64,
    deleted: bool,
    /// Fields other than `_id`, `_rev`, `_deleted` and `_attachments`.
    body: Map<String, Value>,
    attachments: Vec<(String, StoredAttachment)>,
}

struct ServerState {
    database: String,
    documents: HashMap<String, StoredDocument>,
    views: HashMap<(String, String), ViewDefinition>,
    active_tasks: Vec<Value>,
    injected: VecDeque<HttpResponse>,
    requests: Vec<HttpRequest>,
    seq: u64,
    writes: u64,
    timeout: Option<Duration>,
    authorization: Option<String>,
}

/// A write carried a stale or unexpected revision.
struct Conflict;

/// In-memory CouchDB database.
///
/// Clones share state. All data is lost when the last clone is dropped.
#[derive(Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    /// An empty server hosting one database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                database: database.into(),
                documents: HashMap::new(),
                views: HashMap::new(),
                active_tasks: Vec::new(),
                injected: VecDeque::new(),
                requests: Vec::new(),
                seq: 0,
                writes: 0,
                timeout: None,
                authorization: None,
            })),
        }
    }

    pub fn database(&self) -> String {
        self.state.lock().database.clone()
    }

    /// Seed or overwrite a document directly, bypassing revision checks.
    /// Returns the new revision.
    pub fn insert_document(&self, id: &str, document: Value) -> String {
        let mut state = self.state.lock();
        let mut body = match document {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.remove("_rev");
        let current = state.documents.get(id).map(|d| d.rev.clone());
        match state.write_document(id, body, current.as_deref()) {
            Ok(rev) => rev,
            Err(Conflict) => String::new(),
        }
    }

    /// The stored document as a client would read it, unless missing or deleted.
    pub fn document(&self, id: &str) -> Option<Value> {
        let state = self.state.lock();
        state
            .documents
            .get(id)
            .filter(|d| !d.deleted)
            .map(|d| render(id, d))
    }

    /// Current revision, including for deleted documents.
    pub fn revision(&self, id: &str) -> Option<String> {
        self.state.lock().documents.get(id).map(|d| d.rev.clone())
    }

    pub fn document_count(&self) -> usize {
        self.state
            .lock()
            .documents
            .values()
            .filter(|d| !d.deleted)
            .count()
    }

    /// Content type and bytes of an attachment.
    pub fn attachment(&self, id: &str, name: &str) -> Option<(String, Bytes)> {
        let state = self.state.lock();
        let document = state.documents.get(id)?;
        document
            .attachments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| (a.content_type.clone(), a.data.clone()))
    }

    /// Define a map-only view.
    pub fn define_view<F>(&self, design: &str, view: &str, map: F)
    where
        F: Fn(&Value) -> Vec<(Value, Value)> + Send + Sync + 'static,
    {
        self.define(design, view, Arc::new(map), false);
    }

    /// Define a view with a `_count` reduce.
    pub fn define_counted_view<F>(&self, design: &str, view: &str, map: F)
    where
        F: Fn(&Value) -> Vec<(Value, Value)> + Send + Sync + 'static,
    {
        self.define(design, view, Arc::new(map), true);
    }

    fn define(&self, design: &str, view: &str, map: MapFn, count_reduce: bool) {
        self.state.lock().views.insert(
            (design.to_string(), view.to_string()),
            ViewDefinition { map, count_reduce },
        );
    }

    pub fn set_active_tasks(&self, tasks: Vec<Value>) {
        self.state.lock().active_tasks = tasks;
    }

    /// Answer the next request with `response` instead of routing it.
    pub fn inject(&self, response: HttpResponse) {
        self.state.lock().injected.push_back(response);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.state.lock().timeout
    }

    pub fn authorization(&self) -> Option<String> {
        self.state.lock().authorization.clone()
    }

    fn handle(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        if let Some(response) = state.injected.pop_front() {
            return Ok(response);
        }

        let (path, query) = split_url(&request.url)?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let query = parse_query(query);
        trace!(method = %request.method, path, "memory server request");

        if segments.first() == Some(&"_active_tasks") {
            return Ok(HttpResponse::json(200, &Value::Array(state.active_tasks.clone())));
        }

        match segments.first() {
            Some(db) if *db == state.database => {}
            _ => return Ok(error(404, "not_found", "Database does not exist.")),
        }

        let response = match (request.method, &segments[1..]) {
            (Method::Get | Method::Head, []) => HttpResponse::json(
                200,
                &json!({ "db_name": state.database, "doc_count": state.live_count() }),
            ),
            (Method::Post, ["_bulk_docs"]) => state.bulk_docs(&request)?,
            (Method::Get | Method::Post, ["_all_docs"]) => state.all_docs(&request, &query)?,
            (Method::Get, ["_changes"]) => state.changes(&query),
            (Method::Get | Method::Post, ["_design", design, "_view", view]) => {
                state.query_view(design, view, &request, &query)?
            }
            (_, ["_design", ..]) => error(404, "not_found", "missing"),
            (Method::Head, [id]) => state.head_document(id),
            (Method::Get, [id]) => state.get_document(id, &query),
            (Method::Put, [id]) => state.put_document(id, &request, &query)?,
            (Method::Delete, [id]) => state.delete_document(id, &query),
            (Method::Get | Method::Head, [id, name]) => state.get_attachment(id, name),
            (Method::Put, [id, name]) => state.put_attachment(id, name, &request, &query),
            (Method::Delete, [id, name]) => state.delete_attachment(id, name, &query),
            _ => error(405, "method_not_allowed", "Only supported verbs are allowed."),
        };

        Ok(response)
    }
}

#[async_trait]
impl HttpClient for MemoryServer {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.handle(request)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.state.lock().timeout = Some(timeout);
    }

    fn set_authorization(&mut self, value: String) {
        self.state.lock().authorization = Some(value);
    }
}

impl ServerState {
    fn live_count(&self) -> usize {
        self.documents.values().filter(|d| !d.deleted).count()
    }

    /// Apply a write under the usual revision rules and return the new revision.
    fn write_document(
        &mut self,
        id: &str,
        mut body: Map<String, Value>,
        rev_param: Option<&str>,
    ) -> std::result::Result<String, Conflict> {
        let supplied = rev_param
            .map(str::to_string)
            .or_else(|| body.get("_rev").and_then(Value::as_str).map(str::to_string))
            .filter(|r| !r.trim().is_empty());

        let existing = self.documents.get(id);
        match (existing, supplied.as_deref()) {
            (Some(doc), Some(rev)) if doc.rev == rev => {}
            (Some(doc), None) if doc.deleted => {}
            (None, None) => {}
            _ => return Err(Conflict),
        }

        let deleted = body
            .remove("_deleted")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        body.remove("_id");
        body.remove("_rev");
        let kept: Vec<String> = match body.remove("_attachments") {
            Some(Value::Object(stubs)) => stubs.keys().cloned().collect(),
            _ => Vec::new(),
        };

        let (generation, attachments) = match self.documents.remove(id) {
            Some(previous) => (
                previous.generation + 1,
                previous
                    .attachments
                    .into_iter()
                    .filter(|(name, _)| kept.contains(name))
                    .collect(),
            ),
            None => (1, Vec::new()),
        };

        let rev = self.next_rev(generation);
        self.seq += 1;
        self.documents.insert(
            id.to_string(),
            StoredDocument {
                rev: rev.clone(),
                generation,
                seq: self.seq,
                deleted,
                body,
                attachments,
            },
        );
        Ok(rev)
    }

    /// Bump an existing document's revision after an attachment change.
    fn touch(&mut self, id: &str) -> Option<String> {
        let generation = self.documents.get(id)?.generation + 1;
        let rev = self.next_rev(generation);
        self.seq += 1;
        let seq = self.seq;
        let document = self.documents.get_mut(id)?;
        document.generation = generation;
        document.rev = rev.clone();
        document.seq = seq;
        Some(rev)
    }

    fn next_rev(&mut self, generation: u64) -> String {
        self.writes += 1;
        format!("{generation}-{:032x}", self.writes)
    }

    fn head_document(&self, id: &str) -> HttpResponse {
        match self.documents.get(id).filter(|d| !d.deleted) {
            Some(doc) => HttpResponse::new(200).with_header("etag", format!("\"{}\"", doc.rev)),
            None => HttpResponse::new(404),
        }
    }

    fn get_document(&self, id: &str, query: &[(String, String)]) -> HttpResponse {
        let Some(doc) = self.documents.get(id) else {
            return error(404, "not_found", "missing");
        };
        if doc.deleted {
            return error(404, "not_found", "deleted");
        }
        if let Some(rev) = param(query, "rev") {
            if rev != doc.rev {
                return error(404, "not_found", "missing");
            }
        }
        HttpResponse::json(200, &render(id, doc)).with_header("etag", format!("\"{}\"", doc.rev))
    }

    fn put_document(
        &mut self,
        id: &str,
        request: &HttpRequest,
        query: &[(String, String)],
    ) -> Result<HttpResponse> {
        let body = match parse_body(request)? {
            Value::Object(map) => map,
            _ => return Ok(error(400, "bad_request", "Document must be a JSON object")),
        };

        Ok(match self.write_document(id, body, param(query, "rev")) {
            Ok(rev) => updated(201, id, &rev),
            Err(Conflict) => conflict(),
        })
    }

    fn delete_document(&mut self, id: &str, query: &[(String, String)]) -> HttpResponse {
        if !self.documents.get(id).is_some_and(|d| !d.deleted) {
            return error(404, "not_found", "missing");
        }
        let mut body = Map::new();
        body.insert("_deleted".into(), Value::Bool(true));
        match self.write_document(id, body, param(query, "rev")) {
            Ok(rev) => updated(200, id, &rev),
            Err(_) => conflict(),
        }
    }

    fn get_attachment(&self, id: &str, name: &str) -> HttpResponse {
        let found = self
            .documents
            .get(id)
            .filter(|d| !d.deleted)
            .and_then(|d| d.attachments.iter().find(|(n, _)| n == name));

        match found {
            Some((_, attachment)) => HttpResponse::new(200)
                .with_header("content-type", attachment.content_type.clone())
                .with_body(attachment.data.clone()),
            None => error(404, "not_found", "Document is missing attachment"),
        }
    }

    fn put_attachment(
        &mut self,
        id: &str,
        name: &str,
        request: &HttpRequest,
        query: &[(String, String)],
    ) -> HttpResponse {
        let rev = param(query, "rev");
        let current = self.documents.get(id).filter(|d| !d.deleted).map(|d| d.rev.clone());

        match (current.as_deref(), rev) {
            (Some(current), Some(rev)) if current == rev => {}
            (None, None) => {
                if self.write_document(id, Map::new(), None).is_err() {
                    return conflict();
                }
            }
            _ => return conflict(),
        }

        let attachment = StoredAttachment {
            content_type: request
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".into()),
            data: request.body.clone().unwrap_or_default(),
        };

        if let Some(document) = self.documents.get_mut(id) {
            document.attachments.retain(|(n, _)| n != name);
            document.attachments.push((name.to_string(), attachment));
        }

        match self.touch(id) {
            Some(rev) => updated(201, id, &rev),
            None => error(404, "not_found", "missing"),
        }
    }

    fn delete_attachment(&mut self, id: &str, name: &str, query: &[(String, String)]) -> HttpResponse {
        let Some(document) = self.documents.get_mut(id).filter(|d| !d.deleted) else {
            return error(404, "not_found", "missing");
        };
        if param(query, "rev") != Some(document.rev.as_str()) {
            return conflict();
        }
        let before = document.attachments.len();
        document.attachments.retain(|(n, _)| n != name);
        if document.attachments.len() == before {
            return error(404, "not_found", "Document is missing attachment");
        }

        match self.touch(id) {
            Some(rev) => updated(200, id, &rev),
            None => error(404, "not_found", "missing"),
        }
    }

    fn bulk_docs(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        let body = parse_body(request)?;
        let Some(docs) = body.get("docs").and_then(Value::as_array) else {
            return Ok(error(400, "bad_request", "POST body must include `docs` parameter."));
        };

        let mut results = Vec::with_capacity(docs.len());
        for doc in docs.iter().cloned() {
            let Value::Object(doc) = doc else {
                results.push(json!({ "error": "bad_request", "reason": "Document must be a JSON object" }));
                continue;
            };

            let id = match doc.get("_id").and_then(Value::as_str).filter(|s| !s.is_empty()) {
                Some(id) => id.to_string(),
                None => format!("{:032x}", self.writes + 1),
            };

            results.push(match self.write_document(&id, doc, None) {
                Ok(rev) => json!({ "ok": true, "id": id, "rev": rev }),
                Err(_) => json!({
                    "id": id,
                    "error": "conflict",
                    "reason": "Document update conflict."
                }),
            });
        }

        Ok(HttpResponse::json(201, &Value::Array(results)))
    }

    fn all_docs(&self, request: &HttpRequest, query: &[(String, String)]) -> Result<HttpResponse> {
        let include_docs = param(query, "include_docs") == Some("true");
        let keys = requested_keys(request, query)?;

        let rows: Vec<Value> = match keys {
            Some(keys) => keys
                .iter()
                .map(|key| {
                    let id = key.as_str().unwrap_or_default();
                    match self.documents.get(id) {
                        Some(doc) if doc.deleted => json!({
                            "id": id,
                            "key": key,
                            "value": { "rev": doc.rev, "deleted": true },
                            "doc": null
                        }),
                        Some(doc) => all_docs_row(id, doc, include_docs),
                        None => json!({ "key": key, "error": "not_found" }),
                    }
                })
                .collect(),
            None => {
                let mut ids: Vec<&String> = self
                    .documents
                    .iter()
                    .filter(|(_, d)| !d.deleted)
                    .map(|(id, _)| id)
                    .collect();
                ids.sort();
                ids.into_iter()
                    .filter_map(|id| {
                        self.documents
                            .get(id)
                            .map(|doc| all_docs_row(id, doc, include_docs))
                    })
                    .collect()
            }
        };

        Ok(HttpResponse::json(
            200,
            &json!({ "total_rows": self.live_count(), "offset": 0, "rows": rows }),
        ))
    }

    fn changes(&self, query: &[(String, String)]) -> HttpResponse {
        let since: u64 = param(query, "since").and_then(|s| s.parse().ok()).unwrap_or(0);
        let limit: Option<usize> = param(query, "limit").and_then(|s| s.parse().ok());
        let include_docs = param(query, "include_docs") == Some("true");
        let descending = param(query, "descending") == Some("true");

        let mut entries: Vec<(&String, &StoredDocument)> = self
            .documents
            .iter()
            .filter(|(_, d)| d.seq > since)
            .collect();
        entries.sort_by_key(|(_, d)| d.seq);
        if descending {
            entries.reverse();
        }
        if let Some(limit) = limit {
            entries.truncate(limit);
        }

        let results: Vec<Value> = entries
            .iter()
            .map(|(id, doc)| {
                let mut change = json!({
                    "seq": doc.seq,
                    "id": id,
                    "changes": [{ "rev": doc.rev }]
                });
                if doc.deleted {
                    change["deleted"] = Value::Bool(true);
                }
                if include_docs {
                    change["doc"] = render(id, doc);
                }
                change
            })
            .collect();

        let last_seq = entries.last().map_or(since.max(self.seq), |(_, d)| d.seq);
        HttpResponse::json(200, &json!({ "results": results, "last_seq": last_seq }))
    }

    fn query_view(
        &self,
        design: &str,
        view: &str,
        request: &HttpRequest,
        query: &[(String, String)],
    ) -> Result<HttpResponse> {
        let Some(definition) = self.views.get(&(design.to_string(), view.to_string())) else {
            return Ok(error(404, "not_found", "missing_named_view"));
        };

        let mut ids: Vec<&String> = self
            .documents
            .iter()
            .filter(|(_, d)| !d.deleted)
            .map(|(id, _)| id)
            .collect();
        ids.sort();

        let mut rows: Vec<(Value, String, Value, Value)> = Vec::new();
        for id in ids {
            let Some(doc) = self.documents.get(id) else { continue };
            let rendered = render(id, doc);
            for (key, value) in (definition.map)(&rendered) {
                rows.push((key, id.clone(), value, rendered.clone()));
            }
        }
        rows.sort_by(|a, b| collate(&a.0, &b.0).then_with(|| a.1.cmp(&b.1)));
        let total_rows = rows.len();

        let key = json_param(query, "key");
        let start = json_param(query, "startkey");
        let end = json_param(query, "endkey");
        let inclusive_end = param(query, "inclusive_end") != Some("false");

        if let Some(key) = &key {
            rows.retain(|r| collate(&r.0, key) == Ordering::Equal);
        }
        if let Some(start) = &start {
            rows.retain(|r| collate(&r.0, start) != Ordering::Less);
        }
        if let Some(end) = &end {
            rows.retain(|r| match collate(&r.0, end) {
                Ordering::Less => true,
                Ordering::Equal => inclusive_end,
                Ordering::Greater => false,
            });
        }
        if let Some(keys) = requested_keys(request, query)? {
            rows = keys
                .iter()
                .flat_map(|k| {
                    rows.iter()
                        .filter(|r| collate(&r.0, k) == Ordering::Equal)
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .collect();
        }
        if param(query, "descending") == Some("true") {
            rows.reverse();
        }

        let reduce = definition.count_reduce && param(query, "reduce") != Some("false");
        if reduce {
            let grouped = param(query, "group") == Some("true") || param(query, "group_level").is_some();
            let reduced: Vec<Value> = if grouped {
                let mut groups: Vec<(Value, u64)> = Vec::new();
                for row in &rows {
                    match groups.iter_mut().find(|(k, _)| *k == row.0) {
                        Some(group) => group.1 += 1,
                        None => groups.push((row.0.clone(), 1)),
                    }
                }
                groups
                    .into_iter()
                    .map(|(key, count)| json!({ "key": key, "value": count }))
                    .collect()
            } else if rows.is_empty() {
                Vec::new()
            } else {
                vec![json!({ "key": null, "value": rows.len() })]
            };
            return Ok(HttpResponse::json(200, &json!({ "rows": reduced })));
        }

        let skip: usize = param(query, "skip").and_then(|s| s.parse().ok()).unwrap_or(0);
        let limit: usize = param(query, "limit")
            .and_then(|s| s.parse().ok())
            .unwrap_or(usize::MAX);
        let include_docs = param(query, "include_docs") == Some("true");

        let rows: Vec<Value> = rows
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(key, id, value, doc)| {
                let mut row = json!({ "id": id, "key": key, "value": value });
                if include_docs {
                    row["doc"] = doc;
                }
                row
            })
            .collect();

        Ok(HttpResponse::json(
            200,
            &json!({ "total_rows": total_rows, "offset": skip, "rows": rows }),
        ))
    }
}

/// The document as served: `_id`, `_rev`, fields, then attachment stubs.
fn render(id: &str, doc: &StoredDocument) -> Value {
    let mut out = Map::new();
    out.insert("_id".into(), Value::String(id.to_string()));
    out.insert("_rev".into(), Value::String(doc.rev.clone()));
    for (key, value) in &doc.body {
        out.insert(key.clone(), value.clone());
    }
    if !doc.attachments.is_empty() {
        let stubs: Map<String, Value> = doc
            .attachments
            .iter()
            .map(|(name, a)| {
                (
                    name.clone(),
                    json!({
                        "content_type": a.content_type,
                        "length": a.data.len(),
                        "stub": true
                    }),
                )
            })
            .collect();
        out.insert("_attachments".into(), Value::Object(stubs));
    }
    if doc.deleted {
        out.insert("_deleted".into(), Value::Bool(true));
    }
    Value::Object(out)
}

fn all_docs_row(id: &str, doc: &StoredDocument, include_docs: bool) -> Value {
    let mut row = json!({ "id": id, "key": id, "value": { "rev": doc.rev } });
    if include_docs {
        row["doc"] = render(id, doc);
    }
    row
}

fn updated(status: u16, id: &str, rev: &str) -> HttpResponse {
    HttpResponse::json(status, &json!({ "ok": true, "id": id, "rev": rev }))
        .with_header("etag", format!("\"{rev}\""))
}

fn conflict() -> HttpResponse {
    error(409, "conflict", "Document update conflict.")
}

fn error(status: u16, error: &str, reason: &str) -> HttpResponse {
    HttpResponse::json(status, &json!({ "error": error, "reason": reason }))
}

fn parse_body(request: &HttpRequest) -> Result<Value> {
    let body = request.body.as_deref().unwrap_or(b"{}");
    serde_json::from_slice(body).map_err(|e| TransportError::Body(e.to_string()))
}

/// Keys from a POST `{"keys": [...]}` body or a `keys` query parameter.
fn requested_keys(request: &HttpRequest, query: &[(String, String)]) -> Result<Option<Vec<Value>>> {
    if request.method == Method::Post {
        if let Some(Value::Array(keys)) = parse_body(request)?.get("keys") {
            return Ok(Some(keys.clone()));
        }
    }
    Ok(match json_param(query, "keys") {
        Some(Value::Array(keys)) => Some(keys),
        _ => None,
    })
}

/// Split an absolute URL into its path and raw query.
fn split_url(url: &str) -> Result<(&str, &str)> {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| TransportError::InvalidUrl(url.to_string()))?;
    let path_start = rest.find('/').unwrap_or(rest.len());
    let path_and_query = &rest[path_start..];
    Ok(path_and_query.split_once('?').unwrap_or((path_and_query, "")))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(name), percent_decode(value))
        })
        .collect()
}

fn param<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .rev()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn json_param(query: &[(String, String)], name: &str) -> Option<Value> {
    param(query, name).and_then(|raw| serde_json::from_str(raw).ok())
}

fn percent_decode(input: &str) -> String {
    fn hex(byte: &u8) -> Option<u8> {
        (*byte as char).to_digit(16).map(|d| d as u8)
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => match (bytes.get(i + 1).and_then(hex), bytes.get(i + 2).and_then(hex)) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 2;
                }
                _ => out.push(b'%'),
            },
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// CouchDB view collation, simplified: null < bool < number < string < array < object.
fn collate(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(p, q)| collate(p, q))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::HttpClientExt;

    const BASE: &str = "http://couch:5984/shop";

    fn server() -> MemoryServer {
        MemoryServer::new("shop")
    }

    fn body(response: &HttpResponse) -> Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_update_requires_current_rev() {
        let server = server();
        let url = format!("{BASE}/doc-1");

        let created = server.put_json(&url, br#"{"n":1}"#.to_vec()).await.unwrap();
        assert_eq!(created.status, 201);
        let rev = body(&created)["rev"].as_str().unwrap().to_string();
        assert!(rev.starts_with("1-"));

        let again = server.put_json(&url, br#"{"n":2}"#.to_vec()).await.unwrap();
        assert_eq!(again.status, 409);

        let stale = format!("{url}?rev=0-nope");
        assert_eq!(server.put_json(&stale, b"{}".to_vec()).await.unwrap().status, 409);

        let fresh = format!("{url}?rev={rev}");
        let updated = server.put_json(&fresh, br#"{"n":3}"#.to_vec()).await.unwrap();
        assert_eq!(updated.status, 201);
        assert!(body(&updated)["rev"].as_str().unwrap().starts_with("2-"));
        assert_eq!(server.document("doc-1").unwrap()["n"], 3);
    }

    #[tokio::test]
    async fn test_head_returns_quoted_etag() {
        let server = server();
        let rev = server.insert_document("a", json!({ "x": 1 }));

        let head = server.head(&format!("{BASE}/a")).await.unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.etag(), Some(format!("\"{rev}\"").as_str()));
        assert!(head.body.is_empty());

        let missing = server.head(&format!("{BASE}/zz")).await.unwrap();
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn test_unknown_database() {
        let server = server();
        let response = server.get("http://couch:5984/other").await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(server.get(BASE).await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_bulk_docs_reports_per_document_conflicts() {
        let server = server();
        server.insert_document("a", json!({}));
        let rev_b = server.insert_document("b", json!({}));

        let payload = json!({ "docs": [
            { "_id": "a", "_rev": "1-stale" },
            { "_id": "b", "_rev": rev_b, "v": 2 },
            { "_id": "c" }
        ]});
        let response = server
            .post_json(&format!("{BASE}/_bulk_docs"), payload.to_string().into_bytes())
            .await
            .unwrap();

        let results = body(&response);
        assert_eq!(results[0]["error"], "conflict");
        assert_eq!(results[1]["ok"], true);
        assert_eq!(results[2]["id"], "c");
        assert_eq!(server.document("b").unwrap()["v"], 2);
    }

    #[tokio::test]
    async fn test_all_docs_with_keys() {
        let server = server();
        server.insert_document("a", json!({ "v": 1 }));
        server.insert_document("b", json!({ "v": 2 }));

        let payload = json!({ "keys": ["b", "missing", "a"] }).to_string().into_bytes();
        let response = server
            .post_json(&format!("{BASE}/_all_docs?include_docs=true"), payload)
            .await
            .unwrap();
        let rows = body(&response)["rows"].as_array().unwrap().clone();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["doc"]["v"], 2);
        assert_eq!(rows[1]["error"], "not_found");
        assert_eq!(rows[2]["id"], "a");

        let response = server
            .get(&format!("{BASE}/_all_docs?keys=[%22a%22]"))
            .await
            .unwrap();
        let rows = body(&response)["rows"].as_array().unwrap().clone();
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["value"]["rev"].as_str().unwrap().starts_with("1-"));
        assert!(rows[0].get("doc").is_none());
    }

    #[tokio::test]
    async fn test_attachment_lifecycle() {
        let server = server();
        let rev = server.insert_document("d", json!({}));

        let put = server
            .put_content(
                &format!("{BASE}/d/note.txt?rev={rev}"),
                Bytes::from_static(b"hello"),
                "text/plain",
            )
            .await
            .unwrap();
        assert_eq!(put.status, 201);

        let doc = server.document("d").unwrap();
        assert_eq!(doc["_attachments"]["note.txt"]["stub"], true);

        let fetched = server.get(&format!("{BASE}/d/note.txt")).await.unwrap();
        assert_eq!(fetched.content_type(), Some("text/plain"));
        assert_eq!(&fetched.body[..], b"hello");

        let stale = server
            .delete(&format!("{BASE}/d/note.txt?rev={rev}"))
            .await
            .unwrap();
        assert_eq!(stale.status, 409);

        let current = server.revision("d").unwrap();
        let deleted = server
            .delete(&format!("{BASE}/d/note.txt?rev={current}"))
            .await
            .unwrap();
        assert_eq!(deleted.status, 200);
        assert!(server.attachment("d", "note.txt").is_none());
    }

    #[tokio::test]
    async fn test_write_without_stub_drops_attachment() {
        let server = server();
        let rev = server.insert_document("d", json!({}));
        server
            .put_content(&format!("{BASE}/d/a.bin?rev={rev}"), Bytes::from_static(b"1"), "application/octet-stream")
            .await
            .unwrap();
        let rev = server.revision("d").unwrap();

        let keep = json!({ "_rev": rev, "_attachments": { "a.bin": { "stub": true } } });
        server
            .put_json(&format!("{BASE}/d"), keep.to_string().into_bytes())
            .await
            .unwrap();
        assert!(server.attachment("d", "a.bin").is_some());

        let rev = server.revision("d").unwrap();
        let drop = json!({ "_rev": rev, "_attachments": {} });
        server
            .put_json(&format!("{BASE}/d"), drop.to_string().into_bytes())
            .await
            .unwrap();
        assert!(server.attachment("d", "a.bin").is_none());
    }

    #[tokio::test]
    async fn test_changes_feed() {
        let server = server();
        server.insert_document("a", json!({}));
        server.insert_document("b", json!({}));
        server.insert_document("a", json!({ "again": true }));

        let response = server.get(&format!("{BASE}/_changes")).await.unwrap();
        let feed = body(&response);
        let ids: Vec<_> = feed["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(feed["last_seq"], 3);

        let response = server
            .get(&format!("{BASE}/_changes?since=2&include_docs=true"))
            .await
            .unwrap();
        let feed = body(&response);
        assert_eq!(feed["results"].as_array().unwrap().len(), 1);
        assert_eq!(feed["results"][0]["doc"]["again"], true);
    }

    #[tokio::test]
    async fn test_counted_view() {
        let server = server();
        server.define_counted_view("app", "by_kind", |doc| {
            vec![(doc["kind"].clone(), Value::Null)]
        });
        for (id, kind) in [("1", "x"), ("2", "y"), ("3", "x")] {
            server.insert_document(id, json!({ "kind": kind }));
        }

        let url = format!("{BASE}/_design/app/_view/by_kind?include_docs=true&reduce=false&key=%22x%22");
        let rows = body(&server.get(&url).await.unwrap())["rows"].clone();
        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(rows[0]["doc"]["_id"], "1");

        let url = format!("{BASE}/_design/app/_view/by_kind?reduce=true&key=%22x%22");
        let rows = body(&server.get(&url).await.unwrap())["rows"].clone();
        assert_eq!(rows[0]["value"], 2);

        let missing = server
            .get(&format!("{BASE}/_design/app/_view/nope"))
            .await
            .unwrap();
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn test_injected_response_and_recording() {
        let mut server = server();
        server.set_timeout(Duration::from_secs(1));
        server.inject(HttpResponse::new(500).with_body("os_process_timeout"));

        let response = server.get(BASE).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(server.get(BASE).await.unwrap().status, 200);
        assert_eq!(server.request_count(), 2);
        assert_eq!(server.timeout(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("%5B%22a+b%22%5D"), "[\"a b\"]");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn test_collation_order() {
        let mut keys = vec![json!({}), json!("b"), json!(2), json!(null), json!(["a"]), json!(true), json!("a")];
        keys.sort_by(collate);
        assert_eq!(
            keys,
            vec![json!(null), json!(true), json!(2), json!("a"), json!("b"), json!(["a"]), json!({})]
        );
        assert_eq!(collate(&json!(["x", 1]), &json!(["x", {}])), Ordering::Less);
    }
}
