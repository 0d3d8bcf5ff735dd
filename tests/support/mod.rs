#![allow(dead_code)]

use std::time::Duration;

use answer_provider_mock::{ScriptedOutcome, ScriptedTransport};
use legal_qa::{
    ConversationRuntime, CycleHost, DeadlinePolicy, ExecutorConfig, Generation, MessageIndex,
    RevealConfig,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    StartRequest {
        generation: Generation,
        question: String,
    },
    CancelRequest(Generation),
    StartReveal {
        generation: Generation,
        target: MessageIndex,
        text: String,
    },
    StopReveal,
}

#[derive(Debug, Default)]
pub struct HostStub {
    pub calls: Vec<HostCall>,
}

impl HostStub {
    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn request_starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, HostCall::StartRequest { .. }))
            .count()
    }
}

impl CycleHost for HostStub {
    fn start_request(&mut self, generation: Generation, question: &str) {
        self.calls.push(HostCall::StartRequest {
            generation,
            question: question.to_string(),
        });
    }

    fn cancel_request(&mut self, generation: Generation) {
        self.calls.push(HostCall::CancelRequest(generation));
    }

    fn start_reveal(&mut self, generation: Generation, target: MessageIndex, text: &str) {
        self.calls.push(HostCall::StartReveal {
            generation,
            target,
            text: text.to_string(),
        });
    }

    fn stop_reveal(&mut self) {
        self.calls.push(HostCall::StopReveal);
    }
}

/// Default retry policy with a 30 second deadline for every size class.
pub fn executor_config() -> ExecutorConfig {
    ExecutorConfig::default().with_deadlines(DeadlinePolicy::uniform(Duration::from_secs(30)))
}

pub fn runtime(
    outcomes: Vec<ScriptedOutcome>,
    executor: ExecutorConfig,
) -> ConversationRuntime<ScriptedTransport> {
    ConversationRuntime::new(
        ScriptedTransport::new(outcomes),
        executor,
        RevealConfig::default(),
    )
}
