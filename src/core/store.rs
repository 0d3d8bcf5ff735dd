//! Append-only conversation transcript.

use time::OffsetDateTime;

/// Position of a message in the store; stable for the life of a session.
pub type MessageIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    text: String,
    origin: Origin,
    created_at: OffsetDateTime,
    confidence: Option<f64>,
    source: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Origin::User,
            created_at: OffsetDateTime::now_utc(),
            confidence: None,
            source: None,
        }
    }

    pub fn assistant(text: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            text: text.into(),
            origin: Origin::Assistant,
            created_at: OffsetDateTime::now_utc(),
            confidence: confidence.map(answer_provider::clamp_confidence),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_user(&self) -> bool {
        self.origin == Origin::User
    }
}

/// Ordered, grow-only sequence of messages.
///
/// Only [`ConversationStore::reset`] removes entries, and only all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` and returns its index.
    pub fn append(&mut self, message: Message) -> MessageIndex {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn get(&self, index: MessageIndex) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }
}
