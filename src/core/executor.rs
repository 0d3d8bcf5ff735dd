//! Deadline-bounded, retrying, cancellable request execution.
//!
//! One [`TimedExecutor::execute`] call drives up to `max_attempts` transport
//! attempts for a single question. The overall deadline is picked from the
//! question's [`PayloadSizeClass`] and bounds every attempt and backoff
//! sleep together; each attempt's own timeout is clipped to what remains.

use std::future::Future;
use std::time::Duration;

use answer_provider::{
    is_cancelled, Answer, AnswerTransport, AttemptFailure, CancelSignal, Generation,
    NO_ANSWER_MESSAGE,
};
use tokio::time::Instant;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);
/// Stand-in deadline for budgets too large to add to an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1_000);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

/// Largest question (in characters) treated as [`PayloadSizeClass::Short`].
pub const SHORT_MAX_CHARS: usize = 280;
/// Largest question (in characters) treated as [`PayloadSizeClass::Standard`].
pub const STANDARD_MAX_CHARS: usize = 2_000;

/// Terminal failure of one executor invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// The last permitted attempt timed out on its own budget.
    #[error("request timed out")]
    Timeout,
    /// The overall deadline ran out before an answer arrived.
    #[error("overall deadline exceeded")]
    DeadlineExceeded,
    #[error("request cancelled")]
    Cancelled,
    #[error("server rejected the request: {0}")]
    ServerRejected(String),
    /// Transient failures persisted through every attempt.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Size bucket selecting the overall deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSizeClass {
    Short,
    Standard,
    Long,
}

impl PayloadSizeClass {
    pub fn classify(question: &str) -> Self {
        match question.chars().count() {
            n if n <= SHORT_MAX_CHARS => Self::Short,
            n if n <= STANDARD_MAX_CHARS => Self::Standard,
            _ => Self::Long,
        }
    }
}

/// Overall deadline per payload size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlinePolicy {
    pub short: Duration,
    pub standard: Duration,
    pub long: Duration,
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(30),
            standard: Duration::from_secs(45),
            long: Duration::from_secs(60),
        }
    }
}

impl DeadlinePolicy {
    /// Applies the same deadline to every size class.
    pub fn uniform(deadline: Duration) -> Self {
        Self {
            short: deadline,
            standard: deadline,
            long: deadline,
        }
    }

    pub fn deadline_for(&self, class: PayloadSizeClass) -> Duration {
        match class {
            PayloadSizeClass::Short => self.short,
            PayloadSizeClass::Standard => self.standard,
            PayloadSizeClass::Long => self.long,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub attempt_timeout: Duration,
    pub deadlines: DeadlinePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            deadlines: DeadlinePolicy::default(),
        }
    }
}

impl ExecutorConfig {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    #[must_use]
    pub fn with_deadlines(mut self, deadlines: DeadlinePolicy) -> Self {
        self.deadlines = deadlines;
        self
    }

    /// Delay before the attempt following `attempt_index` (zero-based):
    /// `backoff_base * 2^attempt_index`.
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Bookkeeping for one in-flight attempt; never outlives the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAttempt {
    pub started_at: Instant,
    /// One-based.
    pub attempt_number: u32,
    pub deadline: Instant,
}

impl RequestAttempt {
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(self.started_at)
    }
}

#[derive(Debug)]
pub struct TimedExecutor<T> {
    transport: T,
    config: ExecutorConfig,
}

impl<T: AnswerTransport> TimedExecutor<T> {
    pub fn new(transport: T, config: ExecutorConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs `question` to exactly one terminal outcome.
    ///
    /// `generation` only tags log records; staleness is the caller's concern.
    pub async fn execute(
        &self,
        generation: Generation,
        question: &str,
        cancel: &CancelSignal,
    ) -> Result<Answer, ExecutorError> {
        let class = PayloadSizeClass::classify(question);
        let deadline = deadline_after(Instant::now(), self.config.deadlines.deadline_for(class));

        let result = self.run_attempts(generation, question, cancel, deadline).await;
        match &result {
            Ok(answer) => tracing::debug!(
                %generation,
                chars = answer.text.chars().count(),
                confidence = answer.confidence,
                "request succeeded"
            ),
            Err(ExecutorError::Cancelled) => tracing::debug!(%generation, "request cancelled"),
            Err(error) => tracing::warn!(%generation, %error, "request failed"),
        }
        result
    }

    async fn run_attempts(
        &self,
        generation: Generation,
        question: &str,
        cancel: &CancelSignal,
        deadline: Instant,
    ) -> Result<Answer, ExecutorError> {
        let max_attempts = self.config.attempts();
        let mut attempt_index = 0;

        loop {
            if is_cancelled(cancel) {
                return Err(ExecutorError::Cancelled);
            }

            let started_at = Instant::now();
            if started_at >= deadline {
                return Err(ExecutorError::DeadlineExceeded);
            }
            let attempt = RequestAttempt {
                started_at,
                attempt_number: attempt_index + 1,
                deadline,
            };
            let remaining = attempt.remaining();
            let clipped = remaining <= self.config.attempt_timeout;
            let budget = remaining.min(self.config.attempt_timeout);

            tracing::debug!(
                %generation,
                attempt = attempt.attempt_number,
                budget_ms = budget.as_millis() as u64,
                clipped,
                "starting attempt"
            );

            let outcome = await_or_cancel(
                tokio::time::timeout(budget, self.transport.ask(question)),
                cancel,
            )
            .await?;

            let failure = match outcome {
                Ok(Ok(answer)) if answer.text.trim().is_empty() => {
                    return Err(ExecutorError::ServerRejected(NO_ANSWER_MESSAGE.to_string()));
                }
                Ok(Ok(answer)) => return Ok(answer),
                Ok(Err(AttemptFailure::Rejected(message))) => {
                    return Err(ExecutorError::ServerRejected(message));
                }
                Ok(Err(failure)) => failure,
                Err(_elapsed) if clipped => return Err(ExecutorError::DeadlineExceeded),
                Err(_elapsed) => AttemptFailure::TimedOut,
            };

            if Instant::now() >= deadline {
                return Err(ExecutorError::DeadlineExceeded);
            }

            if attempt.attempt_number >= max_attempts {
                return Err(terminal_error(failure));
            }

            let delay = self.config.backoff(attempt_index);
            let crosses_deadline = Instant::now()
                .checked_add(delay)
                .map_or(true, |resume_at| resume_at >= deadline);
            if crosses_deadline {
                tracing::debug!(
                    %generation,
                    attempt = attempt.attempt_number,
                    delay_ms = delay.as_millis() as u64,
                    "backoff would cross the deadline"
                );
                return Err(ExecutorError::DeadlineExceeded);
            }

            tracing::info!(
                %generation,
                attempt = attempt.attempt_number,
                delay_ms = delay.as_millis() as u64,
                %failure,
                "transient failure, retrying"
            );
            await_or_cancel(tokio::time::sleep(delay), cancel).await?;
            attempt_index += 1;
        }
    }
}

/// `now + budget`, saturating at a far-future instant instead of overflowing.
fn deadline_after(now: Instant, budget: Duration) -> Instant {
    now.checked_add(budget)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn terminal_error(failure: AttemptFailure) -> ExecutorError {
    match failure {
        AttemptFailure::TimedOut => ExecutorError::Timeout,
        AttemptFailure::Transient(message) => ExecutorError::NetworkError(message),
        AttemptFailure::Rejected(message) => ExecutorError::ServerRejected(message),
    }
}

/// Awaits `future`, abandoning it as soon as `cancel` is observed.
pub(crate) async fn await_or_cancel<F>(
    future: F,
    cancel: &CancelSignal,
) -> Result<F::Output, ExecutorError>
where
    F: Future,
{
    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancel) {
            return Err(ExecutorError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancel) {
                return Err(ExecutorError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_character_counts() {
        assert_eq!(PayloadSizeClass::classify(""), PayloadSizeClass::Short);
        assert_eq!(
            PayloadSizeClass::classify(&"é".repeat(SHORT_MAX_CHARS)),
            PayloadSizeClass::Short
        );
        assert_eq!(
            PayloadSizeClass::classify(&"a".repeat(SHORT_MAX_CHARS + 1)),
            PayloadSizeClass::Standard
        );
        assert_eq!(
            PayloadSizeClass::classify(&"a".repeat(STANDARD_MAX_CHARS + 1)),
            PayloadSizeClass::Long
        );
    }

    #[test]
    fn backoff_is_exponential() {
        let config = ExecutorConfig::default();

        assert_eq!(config.backoff(0), Duration::from_millis(1_000));
        assert_eq!(config.backoff(1), Duration::from_millis(2_000));
        assert_eq!(config.backoff(2), Duration::from_millis(4_000));
        assert_eq!(
            config.backoff(40),
            Duration::from_millis(1_000).saturating_mul(u32::MAX)
        );
    }

    #[test]
    fn default_deadlines_grow_with_size() {
        let policy = DeadlinePolicy::default();

        assert_eq!(policy.deadline_for(PayloadSizeClass::Short), Duration::from_secs(30));
        assert_eq!(policy.deadline_for(PayloadSizeClass::Standard), Duration::from_secs(45));
        assert_eq!(policy.deadline_for(PayloadSizeClass::Long), Duration::from_secs(60));
    }

    #[test]
    fn zero_max_attempts_still_makes_one_attempt() {
        assert_eq!(ExecutorConfig::default().with_max_attempts(0).attempts(), 1);
    }
}
