use answer_provider::{clamp_confidence, Answer};
use serde::{Deserialize, Serialize};

use crate::error::AnswerApiError;

/// Request body for the answering endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// Success body of the answering endpoint.
///
/// Every field is optional on the wire; [`AnswerResponse::into_answer`]
/// applies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnswerResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

impl AnswerResponse {
    /// Converts the wire body into an [`Answer`].
    ///
    /// A missing or blank `answer` is an error; a missing `confidence` is `0`.
    pub fn into_answer(self) -> Result<Answer, AnswerApiError> {
        let text = self
            .answer
            .filter(|answer| !answer.trim().is_empty())
            .ok_or(AnswerApiError::MissingAnswer)?;

        Ok(Answer {
            text,
            confidence: clamp_confidence(self.confidence.unwrap_or(0.0)),
            source: self
                .source
                .map(|source| source.trim().to_string())
                .filter(|source| !source.is_empty()),
        })
    }
}
