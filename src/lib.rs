//! Resilient conversational client for a question/answer service.
//!
//! Invariant: only the controller mutates conversation state, and it applies
//! an asynchronous result only while that result's [`Generation`] is current.
//!
//! # Public API Overview
//! - Drive a conversation with [`ConversationRuntime`] (tokio) or, without a
//!   runtime, feed [`ConversationController`] events through a [`CycleHost`].
//! - Execute one question against any [`AnswerTransport`] with
//!   [`TimedExecutor`]: retries with exponential backoff under an overall
//!   deadline, abandoned promptly on cancellation.
//! - Reveal answers progressively with [`RevealSequencer`].
//! - Resolve settings with [`ClientConfig::load`].

pub mod config;
pub mod logging;

pub mod core;
pub mod runtime;

pub use answer_provider::{Answer, AnswerTransport, AttemptFailure, CancelSignal, Generation};

pub use crate::config::{ClientConfig, ConfigError, ConfigLayer};
pub use crate::core::controller::{
    describe_error, ConversationController, CycleHost, EventOutcome, Phase, ValidationError,
};
pub use crate::core::executor::{
    DeadlinePolicy, ExecutorConfig, ExecutorError, PayloadSizeClass, RequestAttempt,
    TimedExecutor,
};
pub use crate::core::reveal::{
    RevealConfig, RevealEvent, RevealFrame, RevealFrames, RevealRun, RevealSequencer, RevealSink,
    RevealStage, RevealState,
};
pub use crate::core::store::{ConversationStore, Message, MessageIndex, Origin};
pub use crate::core::view::{format_confidence, ConfidenceTier, ConversationView};
pub use crate::runtime::{ConversationRuntime, CycleEvent};
