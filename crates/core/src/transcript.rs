//! The bounded rolling transcript and its event fold.

use crate::event::{ContentType, MessageKind, ServerEvent};
use std::collections::VecDeque;

/// Maximum number of entries the transcript retains.
pub const TRANSCRIPT_CAPACITY: usize = 10;

/// Insertion-ordered rolling window of rendered message lines.
///
/// Entries appear in exactly the order their events arrived; once the
/// window exceeds [`TRANSCRIPT_CAPACITY`] the oldest entries are
/// evicted first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: VecDeque<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one inbound event into the transcript.
    ///
    /// Completed answer and question messages append their text
    /// content; non-text content is dropped without a trace. Any other
    /// message kind appends a placeholder naming the kind. A
    /// conversation-created event appends its prologue. Everything
    /// else leaves the transcript untouched.
    pub fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::ConversationCreated(created) => self.push(created.prologue.clone()),
            ServerEvent::MessageCompleted(msg) => match &msg.kind {
                MessageKind::Answer | MessageKind::Question => {
                    if msg.content_type == ContentType::Text {
                        self.push(msg.content.clone());
                    }
                }
                MessageKind::Other(_) => self.push(format!("【{}...】", msg.kind)),
            },
            ServerEvent::Other { .. } => {}
        }
    }

    fn push(&mut self, entry: String) {
        self.entries.push_back(entry);
        while self.entries.len() > TRANSCRIPT_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in arrival order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Owned snapshot of the current window, oldest first.
    pub fn to_lines(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}
