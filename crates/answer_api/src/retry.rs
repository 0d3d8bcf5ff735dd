use std::sync::OnceLock;

use regex::Regex;

fn transient_error_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(
            r"(?i)rate.?limit|overloaded|service.?unavailable|temporarily.?unavailable|upstream.?connect|connection.?(refused|reset|closed|aborted)",
        )
        .expect("transient error regex must compile")
    })
}

/// Status policy for transient server-side failures.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..=599).contains(&status)
}

/// Status + error text policy: retryable statuses, or a non-4xx status whose
/// error text describes a transient condition. A 4xx detail is the server's
/// own verdict and never makes the status retryable.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    if is_retryable_status(status) {
        return true;
    }
    !is_client_error_status(status) && is_transient_error_text(error_text)
}

fn is_client_error_status(status: u16) -> bool {
    (400..=499).contains(&status)
}

/// Returns true when transport/error text describes a transient condition.
pub fn is_transient_error_text(error_text: &str) -> bool {
    transient_error_regex().is_match(error_text)
}
