//! Multi-document reads by id, chunked through the batch splitter.
//!
//! Chunks are requested one after another, in input order. Peak memory and
//! in-flight requests stay bounded by `max_documents_per_request`.

use std::collections::{HashMap, HashSet};

use couchlink_core::{split, AllDocsValue, ViewResult};
use couchlink_http::HttpClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::CouchApi;
use crate::error::Result;
use crate::events::EventTimer;

/// Latest revision per distinct id, in first-occurrence order.
///
/// Ids the store does not know map to `None` but keep their entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestRevisions {
    entries: Vec<(String, Option<AllDocsValue>)>,
    index: HashMap<String, usize>,
}

impl LatestRevisions {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The latest revision of `id`, if the store knows it.
    pub fn get(&self, id: &str) -> Option<&AllDocsValue> {
        let position = *self.index.get(id)?;
        self.entries[position].1.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&AllDocsValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl IntoIterator for LatestRevisions {
    type Item = (String, Option<AllDocsValue>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<C: HttpClient> CouchApi<C> {
    /// One entry per response row, in response order. Rows for unknown and
    /// deleted ids carry no document and come back as `None`, so the result
    /// lines up with `ids`. An empty input makes no request.
    pub async fn get_documents<T, S>(&self, ids: &[S]) -> Result<Vec<Option<T>>>
    where
        T: DeserializeOwned,
        S: AsRef<str>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let _event = EventTimer::start("get_many", format!("{} ids", ids.len()));

        let ids: Vec<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let mut documents = Vec::with_capacity(ids.len());
        let blocks = split(ids, self.config.max_documents_per_request)?;
        for (index, block) in blocks.enumerate() {
            debug!(block = index, count = block.len(), "fetching documents");
            let result: ViewResult<T, Value> =
                self.post_keys(self.locations.all_docs(true), &block).await?;
            documents.extend(result.rows.into_iter().map(|row| row.doc));
        }
        Ok(documents)
    }

    /// Latest revision of each distinct id. Duplicates are queried once.
    pub async fn get_latest_revisions<S: AsRef<str>>(&self, ids: &[S]) -> Result<LatestRevisions> {
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = ids
            .iter()
            .map(|id| id.as_ref())
            .filter(|id| seen.insert(*id))
            .collect();
        let _event = EventTimer::start("revisions", format!("{} ids", distinct.len()));

        let mut revisions = LatestRevisions {
            entries: Vec::with_capacity(distinct.len()),
            index: HashMap::with_capacity(distinct.len()),
        };
        let blocks = split(distinct, self.config.max_documents_per_request)?;
        for (index, block) in blocks.enumerate() {
            debug!(block = index, count = block.len(), "fetching revisions");
            let result: ViewResult<Value, AllDocsValue> =
                self.post_keys(self.locations.all_docs(false), &block).await?;

            let mut found: HashMap<String, AllDocsValue> = result
                .rows
                .into_iter()
                .filter(|row| row.error.is_none())
                .filter_map(|row| Some((row.id?, row.value?)))
                .collect();
            for id in block {
                revisions.index.insert(id.to_string(), revisions.entries.len());
                revisions.entries.push((id.to_string(), found.remove(id)));
            }
        }
        Ok(revisions)
    }
}
