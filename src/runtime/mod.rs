//! Tokio driver for [`ConversationController`].
//!
//! Requests and reveals run as spawned tasks that post generation-tagged
//! [`CycleEvent`]s onto one channel. The runtime applies them to the
//! controller one at a time, so all state changes happen on the caller's
//! task and stale events fall through the controller's generation guard.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use answer_provider::{new_cancel_signal, Answer, AnswerTransport, CancelSignal, Generation};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::core::controller::{ConversationController, CycleHost, EventOutcome, ValidationError};
use crate::core::executor::{ExecutorConfig, ExecutorError, TimedExecutor};
use crate::core::reveal::{RevealConfig, RevealEvent, RevealSequencer};
use crate::core::store::MessageIndex;
use crate::core::view::ConversationView;

#[derive(Debug, Clone, PartialEq)]
pub enum CycleEvent {
    Answered {
        generation: Generation,
        result: Result<Answer, ExecutorError>,
    },
    Reveal(RevealEvent),
}

impl CycleEvent {
    pub fn generation(&self) -> Generation {
        match self {
            Self::Answered { generation, .. } => *generation,
            Self::Reveal(event) => event.generation(),
        }
    }
}

impl From<RevealEvent> for CycleEvent {
    fn from(event: RevealEvent) -> Self {
        Self::Reveal(event)
    }
}

struct ActiveRequest {
    generation: Generation,
    cancel: CancelSignal,
    task: JoinHandle<()>,
}

/// [`CycleHost`] that turns controller side effects into tokio tasks.
struct TaskHost<T> {
    executor: Arc<TimedExecutor<T>>,
    sequencer: RevealSequencer,
    sender: UnboundedSender<CycleEvent>,
    active: Option<ActiveRequest>,
}

impl<T: AnswerTransport> TaskHost<T> {
    fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.store(true, Ordering::Release);
        }
    }

    fn clear_active_if_matching(&mut self, generation: Generation) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
        {
            self.active = None;
        }
    }
}

impl<T: AnswerTransport> CycleHost for TaskHost<T> {
    fn start_request(&mut self, generation: Generation, question: &str) {
        self.cancel_active();

        let cancel = new_cancel_signal();
        let executor = Arc::clone(&self.executor);
        let sender = self.sender.clone();
        let question = question.to_string();
        let task_cancel = Arc::clone(&cancel);
        let task = tokio::spawn(async move {
            let result = executor.execute(generation, &question, &task_cancel).await;
            let _ = sender.send(CycleEvent::Answered { generation, result });
        });

        self.active = Some(ActiveRequest {
            generation,
            cancel,
            task,
        });
    }

    fn cancel_request(&mut self, generation: Generation) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
        {
            self.cancel_active();
        }
    }

    fn start_reveal(&mut self, generation: Generation, target: MessageIndex, text: &str) {
        self.sequencer
            .start(generation, target, text, self.sender.clone());
    }

    fn stop_reveal(&mut self) {
        self.sequencer.stop();
    }
}

impl<T> Drop for TaskHost<T> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.store(true, Ordering::Release);
            active.task.abort();
        }
    }
}

pub struct ConversationRuntime<T: AnswerTransport> {
    controller: ConversationController,
    host: TaskHost<T>,
    events: UnboundedReceiver<CycleEvent>,
}

impl<T: AnswerTransport> ConversationRuntime<T> {
    pub fn new(transport: T, executor: ExecutorConfig, reveal: RevealConfig) -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        Self {
            controller: ConversationController::new(),
            host: TaskHost {
                executor: Arc::new(TimedExecutor::new(transport, executor)),
                sequencer: RevealSequencer::new(reveal),
                sender,
                active: None,
            },
            events,
        }
    }

    pub fn from_config(transport: T, config: &ClientConfig) -> Self {
        Self::new(transport, config.executor_config(), config.reveal_config())
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn transport(&self) -> &T {
        self.host.executor.transport()
    }

    pub fn view(&self) -> ConversationView {
        self.controller.view()
    }

    /// Submits `input`; must be called from within a tokio runtime.
    pub fn submit(&mut self, input: &str) -> Result<Generation, ValidationError> {
        self.controller.on_submit(input, &mut self.host)
    }

    pub fn is_outstanding(&self) -> bool {
        self.controller.is_outstanding()
    }

    /// Waits for the next cycle event and applies it.
    ///
    /// Returns [`EventOutcome::Stale`] for events of superseded generations.
    /// Only call this while a cycle is outstanding or events are queued;
    /// otherwise it waits indefinitely.
    pub async fn next_change(&mut self) -> EventOutcome {
        match self.events.recv().await {
            Some(event) => self.apply(event),
            None => EventOutcome::Stale,
        }
    }

    /// Applies every already-queued event without waiting.
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.apply(event).is_applied() {
                applied += 1;
            }
        }
        applied
    }

    pub fn apply(&mut self, event: CycleEvent) -> EventOutcome {
        let generation = event.generation();
        let outcome = match event {
            CycleEvent::Answered { generation, result } => {
                self.host.clear_active_if_matching(generation);
                match result {
                    Ok(answer) => self.controller.on_answer(generation, answer, &mut self.host),
                    Err(error) => self.controller.on_failure(generation, &error),
                }
            }
            CycleEvent::Reveal(RevealEvent::Frame {
                generation, frame, ..
            }) => self.controller.on_reveal_frame(generation, frame),
            CycleEvent::Reveal(RevealEvent::Completed { generation, .. }) => {
                self.controller.on_reveal_completed(generation)
            }
        };

        if outcome == EventOutcome::Stale {
            tracing::trace!(%generation, "dropped stale cycle event");
        }
        outcome
    }

    /// Runs until no cycle is outstanding or the runtime is shut down.
    pub async fn settle(&mut self) {
        while self.controller.is_outstanding() && !self.events.is_closed() {
            self.next_change().await;
        }
    }

    /// Clears the session, cancelling any outstanding cycle.
    pub fn reset(&mut self) {
        self.controller.reset(&mut self.host);
    }

    /// Cancels outstanding work; queued events are discarded and the
    /// controller no longer reports a cycle as outstanding.
    pub fn shutdown(&mut self) {
        self.controller.abandon(&mut self.host);
        if let Some(active) = self.host.active.take() {
            active.cancel.store(true, Ordering::Release);
            active.task.abort();
        }
        self.host.stop_reveal();
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }
}
