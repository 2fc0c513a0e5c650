//! Resource locations within one database.

use couchlink_core::{RevisionToken, ViewParameters};

/// Builds every URL the client requests. Ids and names are used verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    server: String,
    database: String,
}

impl Locations {
    pub fn new(server_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            server: server_url.into(),
            database: database.into(),
        }
    }

    /// `{base}/{db}`
    pub fn database(&self) -> String {
        format!("{}/{}", self.server, self.database)
    }

    /// `{base}/{db}/{id}`
    pub fn document(&self, id: &str) -> String {
        format!("{}/{}", self.database(), id)
    }

    /// `{base}/{db}/{id}?rev={rev}`
    pub fn document_at(&self, id: &str, rev: &str) -> String {
        format!("{}?rev={}", self.document(id), rev)
    }

    /// `{base}/{db}/{id}/{name}`
    pub fn attachment(&self, id: &str, name: &str) -> String {
        format!("{}/{}", self.document(id), name)
    }

    /// `{base}/{db}/{id}/{name}?rev={rev}`
    pub fn attachment_at(&self, id: &str, name: &str, rev: &RevisionToken) -> String {
        format!("{}?rev={}", self.attachment(id, name), rev)
    }

    /// `{base}/{db}/_bulk_docs`
    pub fn bulk_docs(&self) -> String {
        format!("{}/_bulk_docs", self.database())
    }

    /// `{base}/{db}/_all_docs`, with `?include_docs=true` when requested.
    pub fn all_docs(&self, include_docs: bool) -> String {
        if include_docs {
            format!("{}/_all_docs?include_docs=true", self.database())
        } else {
            format!("{}/_all_docs", self.database())
        }
    }

    /// `{base}/{db}/_all_docs?keys=["{id}"]` with the quotes escaped.
    pub fn all_docs_for(&self, id: &str) -> String {
        format!("{}/_all_docs?keys=[%22{}%22]", self.database(), id)
    }

    /// `{base}/{db}/_changes{query}`
    pub fn changes(&self, query: &str) -> String {
        format!("{}/_changes{}", self.database(), query)
    }

    /// `{base}/{db}/_design/{ddoc}/_view/{view}{query}`, or the `_list` form.
    pub fn view(&self, parameters: &ViewParameters) -> String {
        format!(
            "{}/{}{}",
            self.database(),
            parameters.path(),
            parameters.query_string()
        )
    }

    /// `{base}/_active_tasks`
    pub fn active_tasks(&self) -> String {
        format!("{}/_active_tasks", self.server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations() -> Locations {
        Locations::new("http://couch:5984", "shop")
    }

    #[test]
    fn test_document_locations() {
        let l = locations();
        assert_eq!(l.database(), "http://couch:5984/shop");
        assert_eq!(l.document("a"), "http://couch:5984/shop/a");
        assert_eq!(l.document_at("a", "2-x"), "http://couch:5984/shop/a?rev=2-x");
        assert_eq!(
            l.attachment_at("a", "f.txt", &RevisionToken::new("3-y")),
            "http://couch:5984/shop/a/f.txt?rev=3-y"
        );
    }

    #[test]
    fn test_bulk_locations() {
        let l = locations();
        assert_eq!(l.bulk_docs(), "http://couch:5984/shop/_bulk_docs");
        assert_eq!(l.all_docs(true), "http://couch:5984/shop/_all_docs?include_docs=true");
        assert_eq!(l.all_docs(false), "http://couch:5984/shop/_all_docs");
        assert_eq!(l.all_docs_for("a"), "http://couch:5984/shop/_all_docs?keys=[%22a%22]");
        assert_eq!(l.active_tasks(), "http://couch:5984/_active_tasks");
    }

    #[test]
    fn test_view_location() {
        let params = ViewParameters::new("app", "by_date").unwrap().with_list("csv");
        assert_eq!(
            locations().view(&params),
            "http://couch:5984/shop/_design/app/_list/csv/by_date?include_docs=true"
        );
    }
}
