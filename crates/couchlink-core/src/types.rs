//! Strong type definitions for couchlink.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque revision token minted by the store on every successful write.
///
/// Must be supplied on the next write to the same document; the store rejects
/// writes carrying a stale token with a conflict.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    /// Wrap a token as returned in a response body.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Parse an ETag-style header value: surrounding quotes removed, then trimmed.
    ///
    /// Returns `None` when nothing is left.
    pub fn from_etag(etag: &str) -> Option<Self> {
        let token = etag.replace('"', " ");
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The generation number prefix (`3` in `3-abc`), when present.
    pub fn generation(&self) -> Option<u64> {
        self.0.split_once('-').and_then(|(n, _)| n.parse().ok())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevisionToken({})", self.0)
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RevisionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<RevisionToken> for String {
    fn from(token: RevisionToken) -> Self {
        token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_etag_strips_quotes() {
        let token = RevisionToken::from_etag("\"2-7051cbe5c8faecd085a3fa619e6e6337\"").unwrap();
        assert_eq!(token.as_str(), "2-7051cbe5c8faecd085a3fa619e6e6337");
        assert_eq!(token.generation(), Some(2));
    }

    #[test]
    fn test_from_etag_empty() {
        assert!(RevisionToken::from_etag("\"\"").is_none());
        assert!(RevisionToken::from_etag("  ").is_none());
    }

    #[test]
    fn test_display_and_debug() {
        let token = RevisionToken::new("1-abc");
        assert_eq!(format!("{}", token), "1-abc");
        assert_eq!(format!("{:?}", token), "RevisionToken(1-abc)");
        assert_eq!(token.generation(), Some(1));
        assert_eq!(RevisionToken::new("opaque").generation(), None);
    }

    proptest! {
        #[test]
        fn test_from_etag_is_quote_insensitive(rev in "[0-9]{1,3}-[a-f0-9]{32}") {
            let quoted = format!("\"{}\"", rev);
            let padded = format!("  {} ", rev);
            let from_quoted = RevisionToken::from_etag(&quoted).unwrap();
            let from_padded = RevisionToken::from_etag(&padded).unwrap();
            prop_assert_eq!(from_quoted.as_str(), rev.as_str());
            prop_assert_eq!(from_padded.as_str(), rev.as_str());
        }
    }
}
