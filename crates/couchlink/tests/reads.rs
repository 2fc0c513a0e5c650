//! Views, the changes feed and single-document reads against the in-memory store.

mod common;

use anyhow::Result;
use couchlink::core::{AnyDocument, ChangesParameters, Document, ViewParameters};
use couchlink::http::Method;
use couchlink::{CouchApi, PagedResult};
use couchlink_testkit::fixtures::config;
use couchlink_testkit::{Invoice, TestFixture};
use serde_json::{json, Value};

use common::init_tracing;

/// Invoices keyed by `[total]`, valued by their number.
fn define_by_total(fixture: &TestFixture, counted: bool) {
    let map = |doc: &Value| {
        if doc["type"] == "Invoice" {
            vec![(json!([doc["total"]]), doc["number"].clone())]
        } else {
            Vec::new()
        }
    };
    if counted {
        fixture.server.define_counted_view("billing", "by_total", map);
    } else {
        fixture.server.define_view("billing", "by_total", map);
    }
}

fn by_total() -> ViewParameters {
    ViewParameters::new("billing", "by_total").expect("valid view")
}

#[tokio::test]
async fn test_view_documents_in_key_range() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.seed_invoices(5);
    define_by_total(&fixture, false);

    let mut params = by_total();
    params.start_key = vec![json!(10)];
    params.end_key = vec![json!(30)];
    let docs: Vec<Invoice> = fixture.api.get_view_documents(&params).await?;

    let ids: Vec<&str> = docs.iter().map(|d| d.id()).collect();
    assert_eq!(ids, vec!["inv-1", "inv-2", "inv-3"]);
    assert!(docs.iter().all(|d| d.meta.rev.is_some()));
    Ok(())
}

#[tokio::test]
async fn test_view_rows_and_descending() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.seed_invoices(3);
    define_by_total(&fixture, false);

    let mut params = by_total();
    params.descending = Some(true);
    let numbers: Vec<String> = fixture.api.get_view_rows(&params).await?;

    assert_eq!(numbers, vec!["INV-inv-2", "INV-inv-1", "INV-inv-0"]);
    let url = &fixture.server.requests()[0].url;
    assert!(url.contains("include_docs=false"));
    Ok(())
}

#[tokio::test]
async fn test_view_ids_by_posted_keys() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.seed_invoices(4);
    define_by_total(&fixture, false);

    let params = by_total().with_keys(&[json!([20]), json!([0]), json!([99])])?;
    let ids = fixture.api.get_view_document_ids(&params).await?;

    assert_eq!(ids, vec!["inv-2", "inv-0"]);
    assert_eq!(fixture.server.requests()[0].method, Method::Post);
    Ok(())
}

#[tokio::test]
async fn test_paged_view_counts_every_row() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.seed_invoices(5);
    define_by_total(&fixture, true);

    let mut params = by_total();
    params.skip = Some(1);
    params.limit = Some(2);
    let page: PagedResult<Invoice> = fixture.api.get_paged_view_documents(&params).await?;

    let ids: Vec<&str> = page.rows.iter().map(|d| d.id()).collect();
    assert_eq!(ids, vec!["inv-1", "inv-2"]);
    assert_eq!(page.total_rows, 5);
    assert_eq!(fixture.server.request_count(), 2);

    // The caller's parameters are left untouched.
    assert_eq!(params.reduce, None);
    assert_eq!(params.skip, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_unknown_view_is_not_found() -> Result<()> {
    let fixture = TestFixture::new();
    let err = fixture
        .api
        .get_view_documents::<Invoice>(&by_total())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    Ok(())
}

#[tokio::test]
async fn test_changes_since_with_documents() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.seed_invoices(3);

    let params = ChangesParameters {
        since: Some(1),
        include_docs: Some(true),
        ..ChangesParameters::default()
    };
    let changes = fixture.api.get_changes::<Invoice>(&params).await?;

    let ids: Vec<&str> = changes.results.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["inv-1", "inv-2"]);
    assert_eq!(changes.last_seq, "3");
    let doc = changes.results[1].doc.as_ref().expect("included document");
    assert_eq!(doc.total, 20);
    assert_eq!(changes.results[1].revision(), doc.meta.rev.as_deref());
    Ok(())
}

#[tokio::test]
async fn test_changes_report_deletions() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.seed_invoices(2);
    fixture
        .server
        .insert_document("inv-0", json!({ "_deleted": true }));

    let params = ChangesParameters::new().with_parameter("limit", 10);
    let changes = fixture.api.get_changes_untyped(&params).await?;

    let last = changes.results.last().expect("a change");
    assert_eq!(last.id, "inv-0");
    assert!(last.deleted);
    assert!(last.doc.is_none());
    Ok(())
}

#[tokio::test]
async fn test_any_document_resolves_registered_type() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.seed_invoice("inv-1", 70);

    let any = fixture.api.get_any_document("inv-1").await?;
    assert_eq!(any.document_meta().id, "inv-1");
    let invoice = any.downcast_ref::<Invoice>().expect("an invoice");
    assert_eq!(invoice.total, 70);
    Ok(())
}

#[tokio::test]
async fn test_try_get_document_reads_missing_as_none() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.seed_invoice("inv-1", 1);

    assert!(fixture.api.try_get_document::<Invoice>("nope").await?.is_none());
    assert!(fixture.api.try_get_document::<Invoice>("inv-1").await?.is_some());
    assert!(!fixture.api.document_exists("nope").await?);
    Ok(())
}

#[tokio::test]
async fn test_document_at_revision() -> Result<()> {
    let fixture = TestFixture::new();
    let first = fixture.seed_invoice("inv-1", 1);
    let mut invoice: Invoice = fixture.api.get_document("inv-1").await?;
    invoice.total = 2;
    fixture.api.update_document(&mut invoice).await?;
    let current = invoice.meta.rev.clone().expect("written revision");

    let read: Invoice = fixture.api.get_document_at_revision("inv-1", &current).await?;
    assert_eq!(read.total, 2);

    // The store keeps no history, so the superseded revision is gone.
    let err = fixture
        .api
        .get_document_at_revision::<Invoice>("inv-1", &first)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    Ok(())
}

#[tokio::test]
async fn test_latest_document_revision() -> Result<()> {
    let fixture = TestFixture::new();
    let rev = fixture.seed_invoice("inv-1", 1);
    fixture.seed_invoice("gone", 0);
    fixture
        .server
        .insert_document("gone", json!({ "_deleted": true }));

    let live = fixture.api.get_latest_document_revision("inv-1").await?;
    assert_eq!(live.map(|v| v.rev), Some(rev));

    let tombstone = fixture
        .api
        .get_latest_document_revision("gone")
        .await?
        .expect("tombstone revision");
    assert!(tombstone.deleted);
    assert!(tombstone.rev.starts_with("2-"));

    assert_eq!(fixture.api.get_latest_document_revision("never").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_check_connection() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.api.check_connection().await?;

    let elsewhere = CouchApi::new(
        config().with_max_documents_per_request(10).with_port(5984),
        fixture.server.clone(),
    )?;
    elsewhere.check_connection().await?;

    let mut wrong = config();
    wrong.database = "missing".into();
    let err = CouchApi::new(wrong, fixture.server.clone())?
        .check_connection()
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    Ok(())
}

#[tokio::test]
async fn test_active_replication_tasks() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.server.set_active_tasks(vec![
        json!({
            "type": "replication",
            "pid": "<0.1.0>",
            "source": "fixtures",
            "target": "http://backup/fixtures",
            "continuous": true,
            "checkpointed_source_seq": 41,
            "docs_written": 12
        }),
        json!({ "type": "indexer", "pid": "<0.2.0>", "design_document": "_design/billing" }),
    ]);

    let tasks = fixture.api.get_active_replication_tasks().await?;

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].process_id, "<0.1.0>");
    assert!(tasks[0].continuous);
    assert_eq!(tasks[0].checkpointed_source_seq, "41");
    assert_eq!(tasks[0].documents_written, 12);
    assert!(fixture.server.requests()[0].url.ends_with("/_active_tasks"));
    Ok(())
}
