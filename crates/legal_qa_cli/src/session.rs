//! Drives a [`ConversationRuntime`] from terminal input.

use std::io::{self, Write};

use answer_provider::AnswerTransport;
use legal_qa::ConversationRuntime;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::render::TranscriptRenderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOutcome {
    Answered,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    Continue,
    Quit,
}

pub struct Session<T: AnswerTransport, W: Write> {
    runtime: ConversationRuntime<T>,
    renderer: TranscriptRenderer<W>,
}

impl<T: AnswerTransport, W: Write> Session<T, W> {
    pub fn new(runtime: ConversationRuntime<T>, out: W) -> Self {
        Self {
            runtime,
            renderer: TranscriptRenderer::new(out),
        }
    }

    pub fn runtime(&self) -> &ConversationRuntime<T> {
        &self.runtime
    }

    pub fn into_output(self) -> W {
        self.renderer.into_inner()
    }

    /// Asks one question and renders until its cycle finishes.
    pub async fn ask(&mut self, question: &str) -> io::Result<QuestionOutcome> {
        // A rejected submission surfaces through the view's error message.
        let _ = self.runtime.submit(question);
        self.render()?;
        self.finish_outstanding().await?;

        Ok(match self.runtime.controller().error_message() {
            Some(error) => QuestionOutcome::Failed(error.to_string()),
            None => QuestionOutcome::Answered,
        })
    }

    /// Handles one line of input without waiting for the answer.
    pub fn handle_line(&mut self, line: &str) -> io::Result<LineAction> {
        match parse_slash_command(line) {
            Some(SlashCommand::Help) => self.renderer.notice(HELP_TEXT)?,
            Some(SlashCommand::Clear) => {
                self.runtime.reset();
                self.render()?;
                self.renderer.notice("Session cleared.")?;
            }
            Some(SlashCommand::Quit) => return Ok(LineAction::Quit),
            Some(SlashCommand::Unknown(name)) => self
                .renderer
                .notice(&format!("Unknown command {name}. Type /help for commands."))?,
            None => {
                if let Err(error) = self.runtime.submit(line) {
                    tracing::debug!(%error, "ignored submission");
                }
                self.render()?;
            }
        }
        Ok(LineAction::Continue)
    }

    /// Reads questions line by line while answers keep arriving.
    ///
    /// A line typed while a cycle is outstanding supersedes it. At end of
    /// input the current cycle is allowed to finish.
    pub async fn run_interactive<R>(&mut self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        self.finish_outstanding().await?;
                        break;
                    };
                    if self.handle_line(&line)? == LineAction::Quit {
                        break;
                    }
                }
                _ = self.runtime.next_change(), if self.runtime.is_outstanding() => {
                    self.render()?;
                }
            }
        }

        self.runtime.shutdown();
        Ok(())
    }

    async fn finish_outstanding(&mut self) -> io::Result<()> {
        while self.runtime.is_outstanding() {
            self.runtime.next_change().await;
            self.render()?;
        }
        Ok(())
    }

    fn render(&mut self) -> io::Result<()> {
        let view = self.runtime.view();
        self.renderer.render(&view)
    }
}
