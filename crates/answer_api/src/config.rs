use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_BASE_URL;

/// Transport configuration for answering endpoint requests.
#[derive(Debug, Clone)]
pub struct AnswerApiConfig {
    /// Base URL of the answering service; `/legal-qa` is appended on use.
    pub base_url: String,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional whole-exchange timeout applied by the HTTP client itself.
    pub timeout: Option<Duration>,
}

impl Default for AnswerApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            extra_headers: BTreeMap::new(),
            connect_timeout: None,
            timeout: None,
        }
    }
}

impl AnswerApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Merges `headers` over the extra headers set so far.
    pub fn with_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.extra_headers
            .extend(headers.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
