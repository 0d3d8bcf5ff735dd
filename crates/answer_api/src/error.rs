use std::fmt;

use answer_provider::{AttemptFailure, NO_ANSWER_MESSAGE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::retry::{is_retryable_http_error, is_transient_error_text};

#[derive(Debug)]
pub enum AnswerApiError {
    InvalidBaseUrl(String),
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    MissingAnswer,
    MalformedBody(String),
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    detail: Option<Value>,
}

impl ErrorPayload {
    /// FastAPI-style `detail`: either a plain string or a list of validation
    /// entries carrying `msg`.
    fn detail_message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(detail) => non_empty(detail).map(str::to_owned),
            Value::Array(entries) => {
                let messages: Vec<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                    .filter_map(non_empty)
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for AnswerApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::MissingAnswer => write!(f, "{NO_ANSWER_MESSAGE}"),
            Self::MalformedBody(message) => {
                write!(f, "Malformed response from the server: {message}")
            }
        }
    }
}

impl std::error::Error for AnswerApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AnswerApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl AnswerApiError {
    /// Classifies this error for the retrying caller.
    ///
    /// Connection-level transport errors and 5xx/408/429 statuses are
    /// retryable. A 4xx is a definitive rejection whatever its detail says,
    /// and so are transport errors raised before or after the exchange
    /// (request building, body decoding).
    pub fn into_attempt_failure(self) -> AttemptFailure {
        match self {
            Self::Request(error) if error.is_timeout() => AttemptFailure::TimedOut,
            Self::Request(error) => {
                let message = error.to_string();
                if error.is_connect()
                    || error.is_request()
                    || error.is_body()
                    || is_transient_error_text(&message)
                {
                    AttemptFailure::Transient(message)
                } else {
                    AttemptFailure::Rejected(format!("transport failure: {message}"))
                }
            }
            Self::Status(status, message) => {
                if is_retryable_http_error(status.as_u16(), &message) {
                    AttemptFailure::Transient(format!("HTTP {}: {message}", status.as_u16()))
                } else {
                    AttemptFailure::Rejected(message)
                }
            }
            other @ (Self::MissingAnswer
            | Self::MalformedBody(_)
            | Self::InvalidBaseUrl(_)
            | Self::InvalidHeader(_)) => AttemptFailure::Rejected(other.to_string()),
        }
    }
}

/// Extracts the user-facing message from a non-2xx response body.
///
/// Uses the `detail` field when present; otherwise the status text, and
/// finally `Server error: <code>`.
pub fn parse_error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.detail_message() {
            return message;
        }
    }

    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("Server error: {}", status.as_u16()))
}

fn non_empty(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
