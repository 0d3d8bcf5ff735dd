mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use answer_provider::{new_cancel_signal, Generation, NO_ANSWER_MESSAGE};
use answer_provider_mock::{ScriptedOutcome, ScriptedTransport};
use legal_qa::{DeadlinePolicy, ExecutorConfig, ExecutorError, TimedExecutor};
use tokio::time::Instant;

const GENERATION: Generation = Generation::new(1);

fn executor(outcomes: Vec<ScriptedOutcome>, config: ExecutorConfig) -> TimedExecutor<ScriptedTransport> {
    TimedExecutor::new(ScriptedTransport::new(outcomes), config)
}

#[tokio::test(start_paused = true)]
async fn first_attempt_success_returns_answer() {
    let executor = executor(
        vec![ScriptedOutcome::answer("A contract is...", 0.92)],
        support::executor_config(),
    );

    let answer = executor
        .execute(GENERATION, "What is a contract?", &new_cancel_signal())
        .await
        .expect("answer");

    assert_eq!(answer.text, "A contract is...");
    assert_eq!(executor.transport().attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn always_transient_endpoint_waits_for_both_backoffs() {
    let executor = TimedExecutor::new(
        ScriptedTransport::always(ScriptedOutcome::transient("connection reset")),
        support::executor_config(),
    );
    let started = Instant::now();

    let error = executor
        .execute(GENERATION, "q", &new_cancel_signal())
        .await
        .expect_err("exhausted");

    let elapsed = started.elapsed();
    assert_eq!(error, ExecutorError::NetworkError("connection reset".to_string()));
    assert_eq!(executor.transport().attempts(), 3);
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(30), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn backoff_crossing_deadline_fails_without_another_attempt() {
    let config = support::executor_config().with_backoff_base(Duration::from_secs(20));
    let executor = TimedExecutor::new(
        ScriptedTransport::always(ScriptedOutcome::transient("503")),
        config,
    );
    let started = Instant::now();

    let error = executor
        .execute(GENERATION, "q", &new_cancel_signal())
        .await
        .expect_err("deadline");

    assert_eq!(error, ExecutorError::DeadlineExceeded);
    assert_eq!(executor.transport().attempts(), 2);
    assert!(started.elapsed() < Duration::from_secs(21));
}

#[tokio::test(start_paused = true)]
async fn attempt_clipped_at_deadline_reports_deadline_exceeded() {
    let executor = TimedExecutor::new(
        ScriptedTransport::always(ScriptedOutcome::hang()),
        support::executor_config(),
    );
    let started = Instant::now();

    let error = executor
        .execute(GENERATION, "q", &new_cancel_signal())
        .await
        .expect_err("deadline");

    let elapsed = started.elapsed();
    assert_eq!(error, ExecutorError::DeadlineExceeded);
    assert_eq!(executor.transport().attempts(), 2);
    assert!(elapsed >= Duration::from_secs(30), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(30_100), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn two_timeouts_then_success_within_deadline() {
    let config = support::executor_config().with_attempt_timeout(Duration::from_secs(5));
    let executor = executor(
        vec![
            ScriptedOutcome::hang(),
            ScriptedOutcome::hang(),
            ScriptedOutcome::answer("A contract is...", 0.92),
        ],
        config,
    );
    let started = Instant::now();

    let answer = executor
        .execute(GENERATION, "What is a contract?", &new_cancel_signal())
        .await
        .expect("third attempt answers");

    let elapsed = started.elapsed();
    assert_eq!(answer.confidence, 0.92);
    assert_eq!(executor.transport().attempts(), 3);
    assert!(elapsed >= Duration::from_secs(13), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(13_100), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn timeouts_exhaust_into_timeout_error() {
    let config = support::executor_config()
        .with_attempt_timeout(Duration::from_secs(5))
        .with_max_attempts(2);
    let executor = TimedExecutor::new(ScriptedTransport::always(ScriptedOutcome::hang()), config);

    let error = executor
        .execute(GENERATION, "q", &new_cancel_signal())
        .await
        .expect_err("timeout");

    assert_eq!(error, ExecutorError::Timeout);
    assert_eq!(executor.transport().attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn transport_reported_timeout_is_retried() {
    let executor = executor(
        vec![ScriptedOutcome::timeout(), ScriptedOutcome::answer("ok", 0.5)],
        support::executor_config(),
    );

    let answer = executor
        .execute(GENERATION, "q", &new_cancel_signal())
        .await
        .expect("retry succeeds");

    assert_eq!(answer.text, "ok");
    assert_eq!(executor.transport().attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn rejection_is_not_retried() {
    let executor = TimedExecutor::new(
        ScriptedTransport::always(ScriptedOutcome::rejected("Question too vague")),
        support::executor_config(),
    );

    let error = executor
        .execute(GENERATION, "q", &new_cancel_signal())
        .await
        .expect_err("rejected");

    assert_eq!(error, ExecutorError::ServerRejected("Question too vague".to_string()));
    assert_eq!(executor.transport().attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn blank_answer_is_rejected() {
    let executor = executor(
        vec![ScriptedOutcome::answer("  ", 0.9)],
        support::executor_config(),
    );

    let error = executor
        .execute(GENERATION, "q", &new_cancel_signal())
        .await
        .expect_err("rejected");

    assert_eq!(error, ExecutorError::ServerRejected(NO_ANSWER_MESSAGE.to_string()));
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_in_flight_attempt() {
    let executor = TimedExecutor::new(
        ScriptedTransport::always(ScriptedOutcome::hang()),
        support::executor_config(),
    );
    let cancel = new_cancel_signal();
    let setter = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        setter.store(true, Ordering::Release);
    });
    let started = Instant::now();

    let error = executor
        .execute(GENERATION, "q", &cancel)
        .await
        .expect_err("cancelled");

    let elapsed = started.elapsed();
    assert_eq!(error, ExecutorError::Cancelled);
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(3_050), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_skips_next_attempt() {
    let executor = TimedExecutor::new(
        ScriptedTransport::always(ScriptedOutcome::transient("reset")),
        support::executor_config(),
    );
    let cancel = new_cancel_signal();
    let setter = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        setter.store(true, Ordering::Release);
    });

    let error = executor
        .execute(GENERATION, "q", &cancel)
        .await
        .expect_err("cancelled");

    assert_eq!(error, ExecutorError::Cancelled);
    assert_eq!(executor.transport().attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_invocation_never_contacts_transport() {
    let executor = executor(vec![ScriptedOutcome::answer("x", 1.0)], support::executor_config());
    let cancel = new_cancel_signal();
    cancel.store(true, Ordering::Release);

    let error = executor
        .execute(GENERATION, "q", &cancel)
        .await
        .expect_err("cancelled");

    assert_eq!(error, ExecutorError::Cancelled);
    assert_eq!(executor.transport().attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn long_questions_get_the_long_deadline() {
    let config = ExecutorConfig::default()
        .with_attempt_timeout(Duration::from_secs(100))
        .with_deadlines(DeadlinePolicy {
            short: Duration::from_secs(10),
            standard: Duration::from_secs(20),
            long: Duration::from_secs(40),
        });
    let executor = TimedExecutor::new(ScriptedTransport::always(ScriptedOutcome::hang()), config);
    let question = "a".repeat(3_000);
    let started = Instant::now();

    let error = executor
        .execute(GENERATION, &question, &new_cancel_signal())
        .await
        .expect_err("deadline");

    let elapsed = started.elapsed();
    assert_eq!(error, ExecutorError::DeadlineExceeded);
    assert!(elapsed >= Duration::from_secs(40), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(40_100), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn unrepresentable_deadline_does_not_overflow() {
    let config = ExecutorConfig::default()
        .with_attempt_timeout(Duration::MAX)
        .with_deadlines(DeadlinePolicy::uniform(Duration::MAX));
    let executor = executor(
        vec![
            ScriptedOutcome::transient("connection reset"),
            ScriptedOutcome::answer("still answered", 0.7),
        ],
        config,
    );

    let answer = executor
        .execute(GENERATION, "q", &new_cancel_signal())
        .await
        .expect("answer");

    assert_eq!(answer.text, "still answered");
    assert_eq!(executor.transport().attempts(), 2);
}
