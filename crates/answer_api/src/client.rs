use std::collections::BTreeMap;

use answer_provider::{Answer, AnswerTransport, AttemptFuture, TransportProfile};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::config::AnswerApiConfig;
use crate::error::{parse_error_detail, AnswerApiError};
use crate::payload::{AnswerRequest, AnswerResponse};
use crate::url::normalize_answer_url;

/// Transport identifier reported through [`TransportProfile`].
pub const HTTP_TRANSPORT_ID: &str = "http";

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

#[derive(Debug)]
pub struct AnswerApiClient {
    http: Client,
    config: AnswerApiConfig,
    endpoint: String,
}

impl AnswerApiClient {
    pub fn new(config: AnswerApiConfig) -> Result<Self, AnswerApiError> {
        let endpoint = normalize_answer_url(&config.base_url);
        let parsed = url::Url::parse(&endpoint)
            .map_err(|error| AnswerApiError::InvalidBaseUrl(format!("{endpoint}: {error}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AnswerApiError::InvalidBaseUrl(format!(
                "{endpoint}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(AnswerApiError::from)?;

        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    pub fn config(&self) -> &AnswerApiConfig {
        &self.config
    }

    /// Fully resolved `.../legal-qa` endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build_headers(&self) -> Result<HeaderMap, AnswerApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in header_pairs(&self.config) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| AnswerApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    AnswerApiError::InvalidHeader(format!("invalid value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(&self, question: &str) -> Result<reqwest::RequestBuilder, AnswerApiError> {
        let headers = self.build_headers()?;
        Ok(self
            .http
            .post(&self.endpoint)
            .headers(headers)
            .json(&AnswerRequest::new(question)))
    }

    /// Performs exactly one exchange with the answering endpoint.
    pub async fn ask_once(&self, question: &str) -> Result<Answer, AnswerApiError> {
        tracing::debug!(endpoint = %self.endpoint, chars = question.chars().count(), "sending question");

        let response = self.build_request(question)?.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = parse_error_detail(status, &body);
            tracing::debug!(status = status.as_u16(), %message, "answering service returned an error");
            return Err(AnswerApiError::Status(status, message));
        }

        let parsed: AnswerResponse = serde_json::from_str(&body)
            .map_err(|error| AnswerApiError::MalformedBody(error.to_string()))?;
        parsed.into_answer()
    }
}

impl AnswerTransport for AnswerApiClient {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: HTTP_TRANSPORT_ID.to_string(),
            endpoint: self.endpoint.clone(),
        }
    }

    fn ask<'a>(&'a self, question: &'a str) -> AttemptFuture<'a> {
        Box::pin(async move {
            self.ask_once(question)
                .await
                .map_err(AnswerApiError::into_attempt_failure)
        })
    }
}

/// Deterministic header set for one request. Non-blank extra headers
/// override defaults.
fn header_pairs(config: &AnswerApiConfig) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());
    headers.insert(HEADER_CONTENT_TYPE.to_owned(), "application/json".to_owned());
    headers.insert(HEADER_USER_AGENT.to_owned(), default_user_agent());

    for (key, value) in &config.extra_headers {
        if value.trim().is_empty() {
            continue;
        }
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }
    headers
}

fn default_user_agent() -> String {
    format!("legal-qa/{}", env!("CARGO_PKG_VERSION"))
}
