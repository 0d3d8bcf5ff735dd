//! Minimal transport-agnostic contract for answering one question.
//!
//! This crate defines only the shared answer/attempt types and the transport
//! seam. It excludes HTTP details, retry policy, deadlines, and conversation
//! orchestration concerns.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one request invocation.
pub type CancelSignal = Arc<AtomicBool>;

/// Creates a fresh, unset cancellation flag.
#[must_use]
pub fn new_cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

/// Returns true once `signal` has been set by its owner.
#[must_use]
pub fn is_cancelled(signal: &CancelSignal) -> bool {
    signal.load(Ordering::Acquire)
}

/// Monotonically increasing identifier of one request/reveal cycle.
///
/// Every asynchronous continuation carries the generation it was started for;
/// a continuation whose generation is no longer current must not act.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the generation that follows `self`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parsed answer returned by a successful attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub source: Option<String>,
}

impl Answer {
    #[must_use]
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence: clamp_confidence(confidence),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Clamps a reported confidence into `[0, 1]`; non-finite values become `0`.
#[must_use]
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// User-facing rejection text for a success response without answer text.
pub const NO_ANSWER_MESSAGE: &str = "No answer received from the server";

/// Classified failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Connection reset/refused, 5xx and other failures expected to clear up.
    Transient(String),
    /// The attempt hit its own timeout.
    TimedOut,
    /// The endpoint definitively declined the request.
    Rejected(String),
}

impl AttemptFailure {
    /// Returns true when another attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(message) => write!(f, "transient failure: {message}"),
            Self::TimedOut => write!(f, "attempt timed out"),
            Self::Rejected(message) => write!(f, "rejected: {message}"),
        }
    }
}

impl std::error::Error for AttemptFailure {}

/// Boxed future resolving one attempt.
pub type AttemptFuture<'a> = Pin<Box<dyn Future<Output = Result<Answer, AttemptFailure>> + Send + 'a>>;

/// Immutable metadata describing a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportProfile {
    pub transport_id: String,
    pub endpoint: String,
}

/// Transport interface for issuing one answer attempt.
///
/// Implementations perform exactly one network exchange per call and never
/// retry on their own; retry, deadline and cancellation policy belong to the
/// caller.
pub trait AnswerTransport: Send + Sync + 'static {
    /// Returns transport identity metadata.
    fn profile(&self) -> TransportProfile;

    /// Issues a single attempt for `question`.
    fn ask<'a>(&'a self, question: &'a str) -> AttemptFuture<'a>;
}

impl<T: AnswerTransport + ?Sized> AnswerTransport for Arc<T> {
    fn profile(&self) -> TransportProfile {
        (**self).profile()
    }

    fn ask<'a>(&'a self, question: &'a str) -> AttemptFuture<'a> {
        (**self).ask(question)
    }
}
