/// Default base URL of a locally running answering service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Path of the question/answer endpoint under the base URL.
pub const ANSWER_PATH: &str = "/legal-qa";

/// Normalize a base URL to the answering endpoint.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_BASE_URL`]
/// 2) trailing slashes are trimmed
/// 3) `/legal-qa` is appended unless already present
pub fn normalize_answer_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(ANSWER_PATH) {
        return trimmed.to_string();
    }
    format!("{trimmed}{ANSWER_PATH}")
}
