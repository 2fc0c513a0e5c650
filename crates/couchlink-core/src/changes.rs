//! The `_changes` feed: query parameters and result shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::results::sequence;

/// A revision entry of a change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeRevision {
    #[serde(default)]
    pub rev: String,
    #[serde(default)]
    pub deleted: bool,
}

/// One record of the changes feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>"))]
pub struct Change<D = Value> {
    #[serde(default)]
    pub id: String,

    /// Sequence number or id. Numeric sequences are read as their decimal text.
    #[serde(default, deserialize_with = "sequence::lenient")]
    pub seq: String,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default)]
    pub changes: Vec<ChangeRevision>,

    /// Present when the feed ran with `include_docs=true`.
    #[serde(default)]
    pub doc: Option<D>,
}

impl<D> Change<D> {
    /// The first revision listed for this change.
    pub fn revision(&self) -> Option<&str> {
        self.changes.first().map(|c| c.rev.as_str())
    }
}

/// A page of the changes feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>"))]
pub struct ChangesResult<D = Value> {
    #[serde(default)]
    pub results: Vec<Change<D>>,

    #[serde(default, deserialize_with = "sequence::lenient")]
    pub last_seq: String,
}

/// Query parameters for `_changes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangesParameters {
    /// Filter function, `design/name`.
    pub filter: Option<String>,
    pub since: Option<u64>,
    pub limit: Option<u64>,
    pub descending: Option<bool>,
    pub include_docs: Option<bool>,
    /// Extra parameters handed to the filter, appended in insertion order.
    pub additional: Vec<(String, String)>,
}

impl ChangesParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.additional.push((name.into(), value.to_string()));
        self
    }

    /// `?name=value&...` with every value lower-cased, or empty when nothing is set.
    pub fn query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        if let Some(filter) = &self.filter {
            pairs.push(("filter", filter.clone()));
        }
        if let Some(since) = self.since {
            pairs.push(("since", since.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(descending) = self.descending {
            pairs.push(("descending", descending.to_string()));
        }
        if let Some(include_docs) = self.include_docs {
            pairs.push(("include_docs", include_docs.to_string()));
        }
        for (name, value) in &self.additional {
            pairs.push((name.as_str(), value.clone()));
        }

        pairs
            .into_iter()
            .enumerate()
            .map(|(i, (name, value))| {
                let sep = if i == 0 { '?' } else { '&' };
                format!("{sep}{name}={}", value.to_lowercase())
            })
            .collect()
    }
}
