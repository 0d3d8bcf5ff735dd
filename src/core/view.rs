//! Read-only presentation snapshot of a conversation.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::reveal::{RevealStage, RevealState};
use crate::core::store::{Message, MessageIndex, Origin};

/// Color band of the confidence indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub const HIGH_THRESHOLD: f64 = 0.8;
    pub const MEDIUM_THRESHOLD: f64 = 0.5;

    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= Self::HIGH_THRESHOLD {
            Self::High
        } else if confidence >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats a `[0, 1]` confidence as a rounded percentage, e.g. `92%`.
pub fn format_confidence(confidence: f64) -> String {
    let percent = (answer_provider::clamp_confidence(confidence) * 100.0).round() as u32;
    format!("{percent}%")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    pub messages: Vec<Message>,
    pub is_awaiting_response: bool,
    pub error_message: Option<String>,
    pub reveal: Option<RevealState>,
    pub revealed_prefix: String,
    pub metadata_visible: bool,
    /// Last shown prefix of reveals that a newer submission interrupted.
    pub frozen: BTreeMap<MessageIndex, String>,
}

impl ConversationView {
    /// Confidence of the reveal target, shown only once metadata is visible.
    pub fn confidence(&self) -> Option<f64> {
        if !self.metadata_visible {
            return None;
        }
        let target = self.reveal?.target;
        self.messages.get(target)?.confidence()
    }

    pub fn confidence_label(&self) -> Option<String> {
        self.confidence().map(format_confidence)
    }

    pub fn confidence_tier(&self) -> Option<ConfidenceTier> {
        self.confidence().map(ConfidenceTier::from_confidence)
    }

    /// Text of message `index` as currently shown to the user.
    pub fn visible_text(&self, index: MessageIndex) -> Option<&str> {
        let message = self.messages.get(index)?;
        if message.origin() == Origin::User {
            return Some(message.text());
        }
        if let Some(frozen) = self.frozen.get(&index) {
            return Some(frozen.as_str());
        }
        match self.reveal {
            Some(state) if state.target == index && !state.is_text_complete() => {
                if state.stage == RevealStage::Pending {
                    Some("")
                } else {
                    Some(self.revealed_prefix.as_str())
                }
            }
            _ => Some(message.text()),
        }
    }

    pub fn is_revealing(&self) -> bool {
        self.reveal
            .is_some_and(|state| state.stage == RevealStage::RevealingText)
    }
}
