//! View and list query parameters.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, ValidationError};
use crate::validation::require_non_empty;

/// A JSON-encoded, form-escaped view key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParameter(String);

impl KeyParameter {
    /// Encode any serializable key. Empty arrays yield `None`, matching an unset key.
    pub fn new<K: Serialize + ?Sized>(key: &K) -> Result<Option<Self>> {
        let value = serde_json::to_value(key)?;
        if matches!(&value, Value::Array(items) if items.is_empty()) {
            return Ok(None);
        }
        Ok(Some(Self(form_encode(&value.to_string()))))
    }

    /// The value exactly as it appears in the query string.
    pub fn formatted(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyParameter {
    fn from(key: &str) -> Self {
        Self(form_encode(&Value::String(key.to_string()).to_string()))
    }
}

impl From<String> for KeyParameter {
    fn from(key: String) -> Self {
        Self::from(key.as_str())
    }
}

/// Parameters for querying a view, optionally through a list function.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParameters {
    pub design_document: String,
    pub view_name: String,
    pub list_name: Option<String>,
    pub descending: Option<bool>,
    pub limit: Option<u64>,
    /// Defaults to `true`.
    pub include_docs: Option<bool>,
    pub group: Option<bool>,
    pub group_level: Option<u32>,
    /// Emitted as `stale=ok` when true, omitted otherwise.
    pub stale: Option<bool>,
    pub reduce: Option<bool>,
    pub inclusive_end: Option<bool>,
    pub skip: Option<u64>,
    pub key: Option<KeyParameter>,
    /// When set, the view is queried with a POST body and these keys take
    /// precedence over `key`, `start_key` and `end_key` on the server.
    pub keys: Option<Vec<Value>>,
    pub start_key: Vec<Value>,
    pub end_key: Vec<Value>,
    /// Extra raw parameters. A name that matches a built-in one replaces it in place.
    pub extra: Vec<(String, String)>,
}

impl ViewParameters {
    pub fn new(
        design_document: impl Into<String>,
        view_name: impl Into<String>,
    ) -> std::result::Result<Self, ValidationError> {
        let design_document = design_document.into();
        let view_name = view_name.into();
        require_non_empty(&design_document, "design_document")?;
        require_non_empty(&view_name, "view_name")?;

        Ok(Self {
            design_document,
            view_name,
            list_name: None,
            descending: None,
            limit: None,
            include_docs: Some(true),
            group: None,
            group_level: None,
            stale: None,
            reduce: None,
            inclusive_end: None,
            skip: None,
            key: None,
            keys: None,
            start_key: Vec::new(),
            end_key: Vec::new(),
            extra: Vec::new(),
        })
    }

    pub fn with_list(mut self, list_name: impl Into<String>) -> Self {
        self.list_name = Some(list_name.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<KeyParameter>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_keys<K: Serialize>(mut self, keys: &[K]) -> Result<Self> {
        let keys = keys
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.keys = Some(keys);
        Ok(self)
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    /// Path below the database: `_design/{ddoc}/_view/{view}` or
    /// `_design/{ddoc}/_list/{list}/{view}`.
    pub fn path(&self) -> String {
        match self.list_name.as_deref().filter(|name| !name.is_empty()) {
            Some(list) => format!(
                "_design/{}/_list/{}/{}",
                self.design_document, list, self.view_name
            ),
            None => format!("_design/{}/_view/{}", self.design_document, self.view_name),
        }
    }

    /// `?name=value&...` in a fixed parameter order, or empty when nothing is set.
    pub fn query_string(&self) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut push = |name: &str, value: String| pairs.push((name.to_string(), value));

        if let Some(descending) = self.descending {
            push("descending", descending.to_string());
        }
        if let Some(limit) = self.limit {
            push("limit", limit.to_string());
        }
        if let Some(include_docs) = self.include_docs {
            push("include_docs", include_docs.to_string());
        }
        if let Some(group) = self.group {
            push("group", group.to_string());
        }
        if let Some(level) = self.group_level {
            push("group_level", level.to_string());
        }
        if self.stale.unwrap_or(false) {
            push("stale", "ok".to_string());
        }
        if let Some(reduce) = self.reduce {
            push("reduce", reduce.to_string());
        }
        if let Some(inclusive_end) = self.inclusive_end {
            push("inclusive_end", inclusive_end.to_string());
        }
        if let Some(skip) = self.skip {
            push("skip", skip.to_string());
        }
        if let Some(key) = &self.key {
            push("key", key.formatted().to_string());
        }
        if !self.start_key.is_empty() {
            push("startkey", array_value(&self.start_key));
        }
        if !self.end_key.is_empty() {
            push("endkey", array_value(&self.end_key));
        }

        for (name, value) in &self.extra {
            match pairs.iter_mut().find(|(existing, _)| existing == name) {
                Some(pair) => pair.1 = value.clone(),
                None => pairs.push((name.clone(), value.clone())),
            }
        }

        pairs
            .iter()
            .enumerate()
            .map(|(i, (name, value))| {
                let sep = if i == 0 { '?' } else { '&' };
                format!("{sep}{name}={value}")
            })
            .collect()
    }
}

fn array_value(values: &[Value]) -> String {
    form_encode(&Value::Array(values.to_vec()).to_string())
}

/// Form-style escaping: spaces become `+`; everything outside
/// `A-Z a-z 0-9 - _ . ! * ( )` is percent-encoded as UTF-8.
pub fn form_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'!' | b'*' | b'(' | b')' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
