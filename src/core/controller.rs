use std::collections::BTreeMap;

use answer_provider::{Answer, Generation};

use crate::core::executor::ExecutorError;
use crate::core::reveal::{RevealFrame, RevealStage, RevealState};
use crate::core::store::{ConversationStore, Message, MessageIndex};
use crate::core::view::ConversationView;

pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question";
pub const NETWORK_ERROR_MESSAGE: &str = "Unable to reach the answering service. Please try again.";
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
pub const DEADLINE_MESSAGE: &str = "The service is taking too long to respond. Please try again.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingResponse {
        generation: Generation,
    },
    Revealing {
        generation: Generation,
        target: MessageIndex,
    },
    Error,
}

impl Phase {
    /// Generation of the outstanding cycle, if any.
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Self::AwaitingResponse { generation } | Self::Revealing { generation, .. } => {
                Some(*generation)
            }
            Self::Idle | Self::Error => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a question")]
    EmptyQuestion,
}

/// Whether an asynchronous event was applied or ignored as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Stale,
}

impl EventOutcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// Side effects requested by the controller.
pub trait CycleHost {
    fn start_request(&mut self, generation: Generation, question: &str);
    fn cancel_request(&mut self, generation: Generation);
    fn start_reveal(&mut self, generation: Generation, target: MessageIndex, text: &str);
    fn stop_reveal(&mut self);
}

/// Synchronous state machine for one conversation.
///
/// Every asynchronous continuation reaches it as an `on_*` call tagged with
/// the generation it was started for; calls for any other generation return
/// [`EventOutcome::Stale`] and change nothing.
#[derive(Debug, Clone, Default)]
pub struct ConversationController {
    phase: Phase,
    store: ConversationStore,
    generation: Generation,
    error_message: Option<String>,
    reveal: Option<RevealState>,
    revealed_prefix: String,
    frozen: BTreeMap<MessageIndex, String>,
    metadata_reveals: usize,
}

impl ConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Most recently minted generation.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn reveal(&self) -> Option<&RevealState> {
        self.reveal.as_ref()
    }

    pub fn revealed_prefix(&self) -> &str {
        &self.revealed_prefix
    }

    /// Total metadata disclosures since the controller was created.
    pub fn metadata_reveals(&self) -> usize {
        self.metadata_reveals
    }

    pub fn is_outstanding(&self) -> bool {
        self.phase.generation().is_some()
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.phase.generation() == Some(generation)
    }

    /// Accepts a new question, superseding any outstanding cycle.
    pub fn on_submit(
        &mut self,
        input: &str,
        host: &mut dyn CycleHost,
    ) -> Result<Generation, ValidationError> {
        let question = input.trim();
        if question.is_empty() {
            if !self.is_outstanding() {
                self.phase = Phase::Error;
                self.error_message = Some(EMPTY_QUESTION_MESSAGE.to_string());
            }
            return Err(ValidationError::EmptyQuestion);
        }

        if let Some(previous) = self.phase.generation() {
            tracing::debug!(%previous, "superseding outstanding cycle");
            host.cancel_request(previous);
            host.stop_reveal();
            self.freeze_live_reveal();
        }

        let generation = self.generation.next();
        self.generation = generation;
        self.store.append(Message::user(question));
        self.error_message = None;
        self.reveal = None;
        self.revealed_prefix.clear();
        self.phase = Phase::AwaitingResponse { generation };

        tracing::debug!(%generation, "awaiting response");
        host.start_request(generation, question);
        Ok(generation)
    }

    pub fn on_answer(
        &mut self,
        generation: Generation,
        answer: Answer,
        host: &mut dyn CycleHost,
    ) -> EventOutcome {
        if self.phase != (Phase::AwaitingResponse { generation }) {
            return EventOutcome::Stale;
        }

        let message = Message::assistant(answer.text, Some(answer.confidence))
            .with_source(answer.source);
        let target = self.store.append(message);
        self.reveal = Some(RevealState {
            target,
            stage: RevealStage::RevealingText,
            chars_revealed: 0,
        });
        self.revealed_prefix.clear();
        self.phase = Phase::Revealing { generation, target };

        tracing::debug!(%generation, target, "revealing answer");
        let text = self.store.get(target).map(Message::text).unwrap_or_default();
        host.start_reveal(generation, target, text);
        EventOutcome::Applied
    }

    pub fn on_failure(&mut self, generation: Generation, error: &ExecutorError) -> EventOutcome {
        if self.phase != (Phase::AwaitingResponse { generation }) {
            return EventOutcome::Stale;
        }

        match describe_error(error) {
            Some(message) => {
                tracing::debug!(%generation, %error, "cycle failed");
                self.error_message = Some(message);
                self.phase = Phase::Error;
            }
            None => {
                tracing::debug!(%generation, "cycle cancelled");
                self.phase = Phase::Idle;
            }
        }
        EventOutcome::Applied
    }

    pub fn on_reveal_frame(&mut self, generation: Generation, frame: RevealFrame) -> EventOutcome {
        let Phase::Revealing {
            generation: current,
            ..
        } = self.phase
        else {
            return EventOutcome::Stale;
        };
        if current != generation {
            return EventOutcome::Stale;
        }
        let Some(state) = self.reveal.as_mut() else {
            return EventOutcome::Stale;
        };

        state.chars_revealed = frame.chars_revealed;
        self.revealed_prefix = frame.prefix;
        EventOutcome::Applied
    }

    pub fn on_reveal_completed(&mut self, generation: Generation) -> EventOutcome {
        let Phase::Revealing {
            generation: current,
            target,
        } = self.phase
        else {
            return EventOutcome::Stale;
        };
        if current != generation {
            return EventOutcome::Stale;
        }

        let Some(message) = self.store.get(target) else {
            return EventOutcome::Stale;
        };
        let units = crate::core::reveal::RevealFrames::new(message.text()).total_units();
        // A zero confidence carries nothing worth disclosing.
        let has_metadata = message
            .confidence()
            .is_some_and(|confidence| confidence > 0.0);
        self.revealed_prefix = message.text().to_string();

        let stage = if has_metadata {
            self.metadata_reveals += 1;
            RevealStage::MetadataVisible
        } else {
            RevealStage::TextDone
        };
        self.reveal = Some(RevealState {
            target,
            stage,
            chars_revealed: units,
        });
        self.phase = Phase::Idle;

        tracing::debug!(%generation, target, ?stage, "reveal completed");
        EventOutcome::Applied
    }

    /// Discards the whole session and any outstanding cycle.
    pub fn reset(&mut self, host: &mut dyn CycleHost) {
        if let Some(previous) = self.phase.generation() {
            host.cancel_request(previous);
        }
        host.stop_reveal();

        self.store.reset();
        self.frozen.clear();
        self.reveal = None;
        self.revealed_prefix.clear();
        self.error_message = None;
        self.phase = Phase::Idle;
        tracing::debug!(generation = %self.generation, "conversation reset");
    }

    /// Ends the outstanding cycle, if any, keeping the transcript.
    ///
    /// A reveal in progress keeps the prefix shown so far. Later events of
    /// the abandoned generation are stale.
    pub fn abandon(&mut self, host: &mut dyn CycleHost) {
        let Some(previous) = self.phase.generation() else {
            return;
        };
        host.cancel_request(previous);
        host.stop_reveal();
        self.freeze_live_reveal();
        self.reveal = None;
        self.revealed_prefix.clear();
        self.phase = Phase::Idle;
        tracing::debug!(%previous, "cycle abandoned");
    }

    /// Text of message `index` as currently shown.
    pub fn visible_text(&self, index: MessageIndex) -> Option<String> {
        self.view().visible_text(index).map(str::to_owned)
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            messages: self.store.messages().to_vec(),
            is_awaiting_response: matches!(self.phase, Phase::AwaitingResponse { .. }),
            error_message: self.error_message.clone(),
            reveal: self.reveal,
            revealed_prefix: self.revealed_prefix.clone(),
            metadata_visible: self
                .reveal
                .is_some_and(|state| state.stage == RevealStage::MetadataVisible),
            frozen: self.frozen.clone(),
        }
    }

    fn freeze_live_reveal(&mut self) {
        if let Some(state) = self.reveal {
            if !state.is_text_complete() {
                self.frozen.insert(state.target, self.revealed_prefix.clone());
            }
        }
    }
}

/// User-facing message for a terminal executor failure; `None` when silent.
pub fn describe_error(error: &ExecutorError) -> Option<String> {
    match error {
        ExecutorError::Cancelled => None,
        ExecutorError::NetworkError(_) => Some(NETWORK_ERROR_MESSAGE.to_string()),
        ExecutorError::Timeout => Some(TIMEOUT_MESSAGE.to_string()),
        ExecutorError::DeadlineExceeded => Some(DEADLINE_MESSAGE.to_string()),
        ExecutorError::ServerRejected(detail) => Some(detail.clone()),
    }
}
