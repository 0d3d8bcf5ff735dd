use answer_api::retry::*;

#[test]
fn retry_http_status_is_retryable() {
    assert!(is_retryable_status(408));
    assert!(is_retryable_status(429));
    assert!(is_retryable_status(500));
    assert!(is_retryable_status(503));
    assert!(is_retryable_status(599));
}

#[test]
fn client_errors_are_not_retryable() {
    assert!(!is_retryable_status(400));
    assert!(!is_retryable_status(404));
    assert!(!is_retryable_status(422));
    assert!(!is_retryable_http_error(400, "question must not be empty"));
}

#[test]
fn client_error_detail_never_makes_status_retryable() {
    assert!(!is_retryable_http_error(400, "rate limit exceeded"));
    assert!(!is_retryable_http_error(
        403,
        "Daily rate limit for free accounts reached; upgrade your plan"
    ));
    assert!(!is_retryable_http_error(404, "service unavailable in your region"));
    assert!(is_retryable_http_error(429, "slow down"));
}

#[test]
fn retry_http_error_pattern_is_retryable_outside_client_errors() {
    assert!(is_retryable_http_error(302, "upstream connect error"));
    assert!(is_transient_error_text("Service Unavailable"));
    assert!(is_transient_error_text("connection reset by peer"));
}
