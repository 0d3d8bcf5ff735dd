//! Character-paced reveal of assistant text.
//!
//! A reveal walks the text one extended grapheme cluster at a time and emits
//! each growing prefix, then exactly one completion. Runs are versioned: a
//! new [`RevealSequencer::start`] or [`RevealSequencer::stop`] bumps the
//! shared version, and a run whose captured version is stale never emits
//! again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use answer_provider::Generation;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use unicode_segmentation::UnicodeSegmentation;

use crate::core::store::MessageIndex;

pub const DEFAULT_REVEAL_PACE: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStage {
    Pending,
    RevealingText,
    TextDone,
    MetadataVisible,
}

/// Progress of the single live reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealState {
    pub target: MessageIndex,
    pub stage: RevealStage,
    /// Units (grapheme clusters) shown so far.
    pub chars_revealed: usize,
}

impl RevealState {
    pub fn is_text_complete(&self) -> bool {
        matches!(self.stage, RevealStage::TextDone | RevealStage::MetadataVisible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealFrame {
    pub chars_revealed: usize,
    pub prefix: String,
}

/// Lazy, restartable sequence of reveal frames over one text.
#[derive(Debug, Clone)]
pub struct RevealFrames {
    text: Arc<str>,
    offset: usize,
    revealed: usize,
}

impl RevealFrames {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            offset: 0,
            revealed: 0,
        }
    }

    /// Number of frames a full pass yields.
    pub fn total_units(&self) -> usize {
        self.text.graphemes(true).count()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Rewinds to before the first frame.
    pub fn restart(&mut self) {
        self.offset = 0;
        self.revealed = 0;
    }
}

impl Iterator for RevealFrames {
    type Item = RevealFrame;

    fn next(&mut self) -> Option<Self::Item> {
        let unit = self.text[self.offset..].graphemes(true).next()?;
        self.offset += unit.len();
        self.revealed += 1;
        Some(RevealFrame {
            chars_revealed: self.revealed,
            prefix: self.text[..self.offset].to_string(),
        })
    }
}

/// Emission of a reveal run, tagged with the run's generation and target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEvent {
    Frame {
        generation: Generation,
        target: MessageIndex,
        frame: RevealFrame,
    },
    Completed {
        generation: Generation,
        target: MessageIndex,
    },
}

impl RevealEvent {
    pub fn generation(&self) -> Generation {
        match self {
            Self::Frame { generation, .. } | Self::Completed { generation, .. } => *generation,
        }
    }
}

/// Receiver of reveal emissions.
pub trait RevealSink: Send + Sync + 'static {
    fn emit(&self, event: RevealEvent);
}

impl<T> RevealSink for UnboundedSender<T>
where
    T: From<RevealEvent> + Send + 'static,
{
    fn emit(&self, event: RevealEvent) {
        // A closed channel means the owner is gone; nothing left to notify.
        let _ = self.send(T::from(event));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealConfig {
    /// Delay between consecutive units.
    pub pace: Duration,
    /// Texts with more units than this are shown in a single frame.
    pub instant_above: Option<usize>,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            pace: DEFAULT_REVEAL_PACE,
            instant_above: None,
        }
    }
}

impl RevealConfig {
    fn animates(&self, units: usize) -> bool {
        !self.pace.is_zero() && self.instant_above.map_or(true, |limit| units <= limit)
    }
}

/// Handle describing a started run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealRun {
    pub generation: Generation,
    pub target: MessageIndex,
    pub units: usize,
    pub animated: bool,
}

#[derive(Debug, Default)]
pub struct RevealSequencer {
    config: RevealConfig,
    version: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl RevealSequencer {
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            version: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// Starts revealing `text`, replacing any live run.
    ///
    /// Empty and non-animated texts emit synchronously before returning;
    /// otherwise frames arrive from a spawned task, which requires a tokio
    /// runtime context.
    pub fn start(
        &mut self,
        generation: Generation,
        target: MessageIndex,
        text: &str,
        sink: impl RevealSink,
    ) -> RevealRun {
        let version = self.invalidate();
        let frames = RevealFrames::new(text);
        let units = frames.total_units();
        let animated = units > 0 && self.config.animates(units);
        let run = RevealRun {
            generation,
            target,
            units,
            animated,
        };

        tracing::debug!(%generation, target, units, animated, "starting reveal");

        if !animated {
            if units > 0 {
                sink.emit(RevealEvent::Frame {
                    generation,
                    target,
                    frame: RevealFrame {
                        chars_revealed: units,
                        prefix: text.to_string(),
                    },
                });
            }
            sink.emit(RevealEvent::Completed { generation, target });
            return run;
        }

        let shared = Arc::clone(&self.version);
        let pace = self.config.pace;
        self.task = Some(tokio::spawn(async move {
            let is_current = || shared.load(Ordering::Acquire) == version;
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + pace, pace);

            for frame in frames {
                ticks.tick().await;
                if !is_current() {
                    return;
                }
                sink.emit(RevealEvent::Frame {
                    generation,
                    target,
                    frame,
                });
            }

            if is_current() {
                sink.emit(RevealEvent::Completed { generation, target });
            }
        }));

        run
    }

    /// Invalidates the live run, if any, without starting another.
    pub fn stop(&mut self) {
        self.invalidate();
    }

    /// Returns true while a spawned run may still emit.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn invalidate(&mut self) -> u64 {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        version
    }
}

impl Drop for RevealSequencer {
    fn drop(&mut self) {
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_grow_by_grapheme() {
        let frames: Vec<RevealFrame> = RevealFrames::new("ae\u{301}👍🏽").collect();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].prefix, "a");
        assert_eq!(frames[1].prefix, "ae\u{301}");
        assert_eq!(frames[2].prefix, "ae\u{301}👍🏽");
        assert_eq!(frames[2].chars_revealed, 3);
    }

    #[test]
    fn empty_text_has_no_frames() {
        let mut frames = RevealFrames::new("");

        assert_eq!(frames.total_units(), 0);
        assert!(frames.next().is_none());
    }

    #[test]
    fn restart_replays_from_first_frame() {
        let mut frames = RevealFrames::new("abc");
        let first_pass: Vec<RevealFrame> = frames.by_ref().collect();

        frames.restart();
        let second_pass: Vec<RevealFrame> = frames.collect();

        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn clone_is_independent() {
        let mut frames = RevealFrames::new("abc");
        frames.next();
        let copy = frames.clone();

        assert_eq!(frames.count(), 2);
        assert_eq!(copy.count(), 2);
    }

    #[test]
    fn instant_above_disables_animation_for_long_texts() {
        let config = RevealConfig {
            instant_above: Some(4),
            ..RevealConfig::default()
        };

        assert!(config.animates(4));
        assert!(!config.animates(5));
        assert!(!RevealConfig {
            pace: Duration::ZERO,
            instant_above: None
        }
        .animates(1));
    }
}
