//! Transport-only client for the legal Q&A answering endpoint.
//!
//! This crate owns request building, response parsing and failure
//! classification for `POST {base}/legal-qa`. It issues exactly one exchange
//! per call: retry, backoff and deadline policy live with the caller, which
//! sees this client through the [`answer_provider::AnswerTransport`] seam.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod retry;
pub mod url;

pub use client::{AnswerApiClient, HTTP_TRANSPORT_ID};
pub use config::AnswerApiConfig;
pub use error::{parse_error_detail, AnswerApiError};
pub use payload::{AnswerRequest, AnswerResponse};
pub use url::{normalize_answer_url, DEFAULT_BASE_URL};
