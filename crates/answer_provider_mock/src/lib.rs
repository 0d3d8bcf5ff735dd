//! Deterministic mock implementation of the `answer_provider` transport seam.
//!
//! This crate contains no network logic. Each attempt consumes the next
//! scripted outcome, which makes retry, deadline and staleness behavior
//! reproducible under paused tokio time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use answer_provider::{Answer, AnswerTransport, AttemptFailure, AttemptFuture, TransportProfile};

/// Stable transport identifier used for explicit startup selection.
pub const MOCK_TRANSPORT_ID: &str = "mock";

/// Outcome of one scripted attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedOutcome {
    Answer { answer: Answer, delay: Duration },
    Fail { failure: AttemptFailure, delay: Duration },
    /// Never resolves; only a caller-side timeout or cancellation ends it.
    Hang,
    /// Answers with a canned reply that quotes the question.
    Echo { confidence: f64, delay: Duration },
}

impl ScriptedOutcome {
    #[must_use]
    pub fn answer(text: impl Into<String>, confidence: f64) -> Self {
        Self::Answer {
            answer: Answer::new(text, confidence),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Fail {
            failure: AttemptFailure::Transient(message.into()),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Fail {
            failure: AttemptFailure::Rejected(message.into()),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn timeout() -> Self {
        Self::Fail {
            failure: AttemptFailure::TimedOut,
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn hang() -> Self {
        Self::Hang
    }

    /// Delays this outcome by `delay`. No effect on [`ScriptedOutcome::Hang`].
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        match self {
            Self::Answer { answer, .. } => Self::Answer { answer, delay },
            Self::Fail { failure, .. } => Self::Fail { failure, delay },
            Self::Echo { confidence, .. } => Self::Echo { confidence, delay },
            Self::Hang => Self::Hang,
        }
    }
}

/// Transport that replays a fixed script of outcomes, one per attempt.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    repeat: Option<ScriptedOutcome>,
    questions: Mutex<Vec<String>>,
    attempts: AtomicUsize,
}

impl ScriptedTransport {
    /// Replays `outcomes` in order; attempts past the end are rejected.
    #[must_use]
    pub fn new(outcomes: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            repeat: None,
            questions: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Resolves every attempt with `outcome`.
    #[must_use]
    pub fn always(outcome: ScriptedOutcome) -> Self {
        Self::new(Vec::new()).then_repeat(outcome)
    }

    /// Replays the script, then falls back to `outcome` for every later attempt.
    #[must_use]
    pub fn then_repeat(mut self, outcome: ScriptedOutcome) -> Self {
        self.repeat = Some(outcome);
        self
    }

    /// Offline transport for local runs: canned echo answers after a short pause.
    #[must_use]
    pub fn demo() -> Self {
        Self::always(ScriptedOutcome::Echo {
            confidence: Self::DEMO_CONFIDENCE,
            delay: Duration::from_millis(Self::DEMO_DELAY_MS),
        })
    }

    /// Number of attempts issued so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }

    /// Questions received, in attempt order.
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        lock_unpoisoned(&self.questions).clone()
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        lock_unpoisoned(&self.script)
            .pop_front()
            .or_else(|| self.repeat.clone())
            .unwrap_or_else(|| ScriptedOutcome::rejected("mock script exhausted"))
    }

    const DEMO_CONFIDENCE: f64 = 0.86;
    const DEMO_DELAY_MS: u64 = 800;
}

impl AnswerTransport for ScriptedTransport {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: MOCK_TRANSPORT_ID.to_string(),
            endpoint: "memory://scripted".to_string(),
        }
    }

    fn ask<'a>(&'a self, question: &'a str) -> AttemptFuture<'a> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        lock_unpoisoned(&self.questions).push(question.to_string());
        let outcome = self.next_outcome();

        Box::pin(async move {
            match outcome {
                ScriptedOutcome::Answer { answer, delay } => {
                    pause(delay).await;
                    Ok(answer)
                }
                ScriptedOutcome::Fail { failure, delay } => {
                    pause(delay).await;
                    Err(failure)
                }
                ScriptedOutcome::Echo { confidence, delay } => {
                    pause(delay).await;
                    Ok(Answer::new(echo_text(question), confidence).with_source(MOCK_TRANSPORT_ID))
                }
                ScriptedOutcome::Hang => std::future::pending().await,
            }
        })
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn echo_text(question: &str) -> String {
    format!(
        "You asked: \"{}\". This offline answer is generated locally; connect to the answering service for real guidance.",
        question.trim()
    )
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
