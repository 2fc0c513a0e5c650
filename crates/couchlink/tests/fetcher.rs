//! Multi-document reads: chunking, ordering and deduplication.

mod common;

use std::collections::HashSet;

use anyhow::Result;
use couchlink::core::Document;
use couchlink::http::Method;
use couchlink_testkit::responses::{self, revisions};
use couchlink_testkit::{id_list_with_duplicates, invoice_json, scripted, Invoice, TestFixture};
use proptest::prelude::*;
use serde_json::json;

use common::{init_tracing, sent_keys};

#[tokio::test]
async fn test_three_ids_in_blocks_of_two() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::with_max_documents_per_request(2);
    let ids = fixture.seed_invoices(3);
    fixture.server.clear_requests();

    let docs: Vec<Invoice> = fixture
        .api
        .get_documents::<Invoice, _>(&ids)
        .await?
        .into_iter()
        .flatten()
        .collect();

    let requests = fixture.server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(sent_keys(&requests[0]), json!(["inv-0", "inv-1"]));
    assert_eq!(sent_keys(&requests[1]), json!(["inv-2"]));

    let fetched: Vec<&str> = docs.iter().map(|d| d.id()).collect();
    assert_eq!(fetched, vec!["inv-0", "inv-1", "inv-2"]);
    assert_eq!(docs[2].total, 20);
    Ok(())
}

#[tokio::test]
async fn test_blocks_are_sent_in_order() -> Result<()> {
    let (client, api) = scripted(2);
    client
        .push(responses::all_docs(&[invoice_json("a", 1), invoice_json("b", 2)]))
        .push(responses::all_docs(&[invoice_json("c", 3), invoice_json("d", 4)]))
        .push(responses::all_docs(&[invoice_json("e", 5)]));

    let docs: Vec<Option<Invoice>> = api.get_documents(&["a", "b", "c", "d", "e"]).await?;
    let totals: Vec<u64> = docs.iter().flatten().map(|d| d.total).collect();
    assert_eq!(totals, vec![1, 2, 3, 4, 5]);

    let requests = client.requests();
    assert!(requests.iter().all(|r| r.method == Method::Post));
    assert!(requests.iter().all(|r| r.url.ends_with("/_all_docs?include_docs=true")));
    assert_eq!(sent_keys(&requests[2]), json!(["e"]));
    Ok(())
}

#[tokio::test]
async fn test_fetch_keeps_missing_and_deleted_as_none() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.seed_invoices(2);
    fixture.seed_invoice("gone", 0);
    fixture
        .server
        .insert_document("gone", json!({ "_deleted": true }));

    let docs: Vec<Option<Invoice>> = fixture
        .api
        .get_documents(&["inv-0", "missing", "gone", "inv-1"])
        .await?;

    let fetched: Vec<Option<&str>> = docs.iter().map(|d| d.as_ref().map(|d| d.id())).collect();
    assert_eq!(fetched, vec![Some("inv-0"), None, None, Some("inv-1")]);
    Ok(())
}

#[tokio::test]
async fn test_empty_fetch_makes_no_request() -> Result<()> {
    let fixture = TestFixture::new();
    let none: Vec<String> = Vec::new();

    let docs: Vec<Option<Invoice>> = fixture.api.get_documents(&none).await?;
    let revs = fixture.api.get_latest_revisions(&none).await?;

    assert!(docs.is_empty());
    assert!(revs.is_empty());
    assert_eq!(fixture.server.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_latest_revisions_query_distinct_ids_once() -> Result<()> {
    let (client, api) = scripted(500);
    client.push(revisions(&[("A", Some("3-a")), ("B", None)]));

    let latest = api.get_latest_revisions(&["A", "B", "A"]).await?;

    assert_eq!(client.request_count(), 1);
    assert_eq!(sent_keys(&client.requests()[0]), json!(["A", "B"]));
    assert_eq!(latest.len(), 2);
    assert_eq!(latest.get("A").map(|v| v.rev.as_str()), Some("3-a"));
    assert!(latest.contains("B"));
    assert!(latest.get("B").is_none());
    Ok(())
}

#[tokio::test]
async fn test_latest_revisions_match_store() -> Result<()> {
    let fixture = TestFixture::with_max_documents_per_request(2);
    let ids = fixture.seed_invoices(5);
    fixture.server.clear_requests();

    let latest = fixture.api.get_latest_revisions(&ids).await?;

    assert_eq!(fixture.server.request_count(), 3);
    for (id, value) in latest.iter() {
        assert_eq!(value.map(|v| v.rev.clone()), fixture.server.revision(id));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_latest_revisions_dedupe(ids in id_list_with_duplicates(24), block in 1usize..6) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let fixture = TestFixture::with_max_documents_per_request(block);
        for id in ["doc-0", "doc-2", "doc-5"] {
            fixture.seed_invoice(id, 1);
        }
        fixture.server.clear_requests();

        let latest = runtime.block_on(fixture.api.get_latest_revisions(&ids)).unwrap();

        let mut seen = HashSet::new();
        let distinct: Vec<&str> = ids.iter().map(String::as_str).filter(|id| seen.insert(*id)).collect();

        prop_assert_eq!(latest.ids().collect::<Vec<_>>(), distinct.clone());
        prop_assert_eq!(fixture.server.request_count(), distinct.len().div_ceil(block));

        let queried: usize = fixture
            .server
            .requests()
            .iter()
            .map(|r| sent_keys(r).as_array().map_or(0, Vec::len))
            .sum();
        prop_assert_eq!(queried, distinct.len());

        for (id, value) in latest.iter() {
            prop_assert_eq!(value.is_some(), fixture.server.revision(id).is_some());
        }
    }
}
