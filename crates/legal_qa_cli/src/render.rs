//! Line-oriented transcript output.
//!
//! The renderer diffs successive [`ConversationView`]s and writes only what
//! changed, so a reveal streams as it grows instead of redrawing the
//! transcript.

use std::io::{self, Write};

use legal_qa::{ConversationView, MessageIndex, Origin};

pub const USER_PREFIX: &str = "You: ";
pub const ASSISTANT_PREFIX: &str = "Assistant: ";
pub const THINKING_LINE: &str = "Thinking…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenLine {
    index: MessageIndex,
    /// Bytes of the message text already written.
    written: usize,
}

pub struct TranscriptRenderer<W: Write> {
    out: W,
    printed: usize,
    open: Option<OpenLine>,
    thinking_shown: bool,
    last_error: Option<String>,
    metadata_for: Option<MessageIndex>,
}

impl<W: Write> TranscriptRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            open: None,
            thinking_shown: false,
            last_error: None,
            metadata_for: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes a free-form notice line, closing any open assistant line first.
    pub fn notice(&mut self, line: &str) -> io::Result<()> {
        self.close_open_line()?;
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    pub fn render(&mut self, view: &ConversationView) -> io::Result<()> {
        if view.messages.len() < self.printed {
            // The session was cleared.
            self.close_open_line()?;
            self.printed = 0;
            self.metadata_for = None;
            self.last_error = None;
        }

        self.stream_open_line(view)?;

        for index in self.printed..view.messages.len() {
            self.close_open_line()?;
            self.thinking_shown = false;
            let message = &view.messages[index];
            match message.origin() {
                Origin::User => writeln!(self.out, "{USER_PREFIX}{}", message.text())?,
                Origin::Assistant => {
                    write!(self.out, "{ASSISTANT_PREFIX}")?;
                    self.open = Some(OpenLine { index, written: 0 });
                    self.stream_open_line(view)?;
                }
            }
        }
        self.printed = view.messages.len();

        if view.is_awaiting_response {
            if !self.thinking_shown {
                self.close_open_line()?;
                writeln!(self.out, "{THINKING_LINE}")?;
                self.thinking_shown = true;
            }
        } else {
            self.thinking_shown = false;
        }

        if view.error_message != self.last_error {
            if let Some(error) = view.error_message.as_deref() {
                self.close_open_line()?;
                writeln!(self.out, "Error: {error}")?;
            }
            self.last_error = view.error_message.clone();
        }

        if let (Some(label), Some(tier), Some(reveal)) =
            (view.confidence_label(), view.confidence_tier(), view.reveal)
        {
            if self.metadata_for != Some(reveal.target) {
                self.close_open_line()?;
                writeln!(self.out, "Confidence Score: {label} ({tier})")?;
                self.metadata_for = Some(reveal.target);
            }
        }

        self.out.flush()
    }

    /// Writes the newly visible suffix of the open assistant line and ends
    /// the line once its text is complete or a later message superseded it.
    fn stream_open_line(&mut self, view: &ConversationView) -> io::Result<()> {
        let Some(open) = self.open else {
            return Ok(());
        };
        let (Some(message), Some(visible)) =
            (view.messages.get(open.index), view.visible_text(open.index))
        else {
            return self.close_open_line();
        };

        if let Some(suffix) = visible.get(open.written..) {
            if !suffix.is_empty() {
                write!(self.out, "{suffix}")?;
            }
        }
        let written = visible.len().max(open.written);
        self.open = Some(OpenLine {
            index: open.index,
            written,
        });

        let complete = written >= message.text().len();
        let superseded = open.index + 1 < view.messages.len();
        if complete || superseded {
            self.close_open_line()?;
        }
        Ok(())
    }

    fn close_open_line(&mut self) -> io::Result<()> {
        if self.open.take().is_some() {
            writeln!(self.out)?;
        }
        Ok(())
    }
}
