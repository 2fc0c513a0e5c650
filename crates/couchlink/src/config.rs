//! Client configuration and the `Key=Value;` connection string.

use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use couchlink_core::batch::DEFAULT_MAX_DOCUMENTS_PER_REQUEST;
use couchlink_core::validation::{require_at_least, require_non_empty};
use couchlink_core::ValidationError;

/// Default request timeout handed to the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Configuration for [`CouchApi`](crate::CouchApi).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    /// Host name, optionally with an `http://` or `https://` scheme.
    pub server: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    /// Database name. Always lower-case.
    pub database: String,
    pub timeout: Duration,
    /// Cap on ids per multi-document read. Bulk writes are not capped.
    pub max_documents_per_request: usize,
}

impl Default for CouchConfig {
    fn default() -> Self {
        Self {
            server: "localhost".into(),
            port: Some(5984),
            user: String::new(),
            password: String::new(),
            database: String::new(),
            timeout: DEFAULT_TIMEOUT,
            max_documents_per_request: DEFAULT_MAX_DOCUMENTS_PER_REQUEST,
        }
    }
}

impl CouchConfig {
    pub fn new(server: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            database: database.into().to_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_documents_per_request(mut self, max: usize) -> Self {
        self.max_documents_per_request = max;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.server, "server")?;
        require_non_empty(&self.database, "database")?;
        require_at_least(self.max_documents_per_request, 1, "max_documents_per_request")
    }

    /// `http://server[:port]`. A server that already carries a scheme keeps it.
    pub fn server_url(&self) -> String {
        let server = self.server.trim_end_matches('/');
        let scheme = if server.starts_with("http://") || server.starts_with("https://") {
            ""
        } else {
            "http://"
        };
        match self.port {
            Some(port) => format!("{scheme}{server}:{port}"),
            None => format!("{scheme}{server}"),
        }
    }

    /// `Basic base64(user:password)`.
    pub fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.user, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

impl FromStr for CouchConfig {
    type Err = ValidationError;

    /// Parse `Server=...;Port=...;User=...;Password=...;DatabaseName=...`.
    ///
    /// Keys are case-insensitive and unknown keys are ignored. A port that
    /// is not a number is treated as absent.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut config = CouchConfig {
            server: String::new(),
            port: None,
            ..CouchConfig::default()
        };

        for pair in s.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "server" => config.server = value.to_string(),
                "port" => config.port = value.parse().ok(),
                "user" => config.user = value.to_string(),
                "password" => config.password = value.to_string(),
                "databasename" => config.database = value.to_lowercase(),
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection_string() {
        let config: CouchConfig = "Server=couch.local;Port=6984;User=admin;Password=s3cret;DatabaseName=Orders"
            .parse()
            .unwrap();

        assert_eq!(config.server, "couch.local");
        assert_eq!(config.port, Some(6984));
        assert_eq!(config.user, "admin");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.database, "orders");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_documents_per_request, 500);
    }

    #[test]
    fn test_parse_is_lenient() {
        let config: CouchConfig = "server=h; port=abc; Extra=1; databasename=db;".parse().unwrap();
        assert_eq!(config.port, None);
        assert_eq!(config.server_url(), "http://h");
    }

    #[test]
    fn test_parse_requires_server_and_database() {
        assert_eq!(
            "DatabaseName=db".parse::<CouchConfig>(),
            Err(ValidationError::Empty { field: "server" })
        );
        assert_eq!(
            "Server=h".parse::<CouchConfig>(),
            Err(ValidationError::Empty { field: "database" })
        );
    }

    #[test]
    fn test_server_url() {
        assert_eq!(CouchConfig::new("h", "d").server_url(), "http://h:5984");
        assert_eq!(
            CouchConfig::new("https://h/", "d").with_port(443).server_url(),
            "https://h:443"
        );
    }

    #[test]
    fn test_basic_auth() {
        let config = CouchConfig::new("h", "d").with_credentials("user", "pass");
        assert_eq!(config.basic_auth(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_database_is_lowercased() {
        assert_eq!(CouchConfig::new("h", "MixedCase").database, "mixedcase");
    }
}
