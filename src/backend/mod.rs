//! Search backends: the provider-facing side of a harvest.

pub mod duckduckgo;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Search vertical a query is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// News-indexed search.
    News,
    /// General web search.
    Text,
    /// General web search restricted to one document type.
    Filetype,
}

impl BackendKind {
    /// Name of the field carrying the destination link on this vertical's
    /// native results.
    pub fn link_field(self) -> &'static str {
        match self {
            BackendKind::News => "url",
            BackendKind::Text | BackendKind::Filetype => "href",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::News => "news",
            BackendKind::Text => "text",
            BackendKind::Filetype => "filetype",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One provider-native result. Field names and value types depend on the
/// vertical that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub kind: BackendKind,
    pub fields: Map<String, Value>,
}

impl RawResult {
    pub fn new(kind: BackendKind, fields: Map<String, Value>) -> Self {
        Self { kind, fields }
    }

    /// Returns the field rendered as text, or `None` when it is absent or null.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Destination link, read through the vertical's link-field rule.
    pub fn link(&self) -> Option<String> {
        self.text(self.kind.link_field())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("search rate limit exceeded")]
    RateLimited,

    #[error("search request failed: status {0}")]
    Status(u16),

    #[error("could not obtain vqd token for query")]
    MissingToken,

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("search call timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Executes raw queries against one search provider.
/// Implemented by `DuckDuckGo` for production; stubs are used in tests.
pub trait SearchBackend {
    async fn execute(
        &self,
        kind: BackendKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RawResult>, BackendError>;
}
