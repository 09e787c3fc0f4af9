//! Append-only chat log shared by the session and its scheduler.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Session-local identifier, strictly increasing in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Bot,
    User,
}

/// Label/value pair rendered as a summary card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCard {
    pub label: String,
    pub value: String,
}

/// How an entry is presented. Options and card are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Presentation {
    Plain,
    Options { options: Vec<String> },
    Card { card: SummaryCard },
}

/// Content of a chat entry before it receives an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub sender: Sender,
    pub text: String,
    pub presentation: Presentation,
}

impl EntryDraft {
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            presentation: Presentation::Plain,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            presentation: Presentation::Plain,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.presentation = Presentation::Options {
            options: options.into_iter().map(Into::into).collect(),
        };
        self
    }

    pub fn with_card(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.presentation = Presentation::Card {
            card: SummaryCard {
                label: label.into(),
                value: value.into(),
            },
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: EntryId,
    pub sender: Sender,
    pub text: String,
    pub presentation: Presentation,
    pub created_at: DateTime<Utc>,
}

impl ChatEntry {
    pub fn options(&self) -> Option<&[String]> {
        match &self.presentation {
            Presentation::Options { options } => Some(options),
            _ => None,
        }
    }

    pub fn card(&self) -> Option<&SummaryCard> {
        match &self.presentation {
            Presentation::Card { card } => Some(card),
            _ => None,
        }
    }
}

/// Ordered log of chat entries. Entries can only be appended.
///
/// Every append is published to subscribers so a presentation layer can
/// re-render without polling. Once closed, appends are dropped.
#[derive(Debug)]
pub struct Timeline {
    entries: Vec<ChatEntry>,
    next_id: u64,
    closed: bool,
    events: broadcast::Sender<ChatEntry>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Vec::new(),
            next_id: 1,
            closed: false,
            events,
        }
    }

    /// Appends `draft` and returns the stored entry, or `None` once closed.
    pub fn append(&mut self, draft: EntryDraft) -> Option<ChatEntry> {
        if self.closed {
            return None;
        }
        let entry = ChatEntry {
            id: EntryId(self.next_id),
            sender: draft.sender,
            text: draft.text,
            presentation: draft.presentation,
            created_at: Utc::now(),
        };
        self.next_id += 1;
        self.entries.push(entry.clone());
        // No receivers is fine.
        let _ = self.events.send(entry.clone());
        Some(entry)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEntry> {
        self.events.subscribe()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Options offered by the latest entry, if it is a bot entry carrying chips.
    pub fn current_options(&self) -> Option<&[String]> {
        self.last()
            .filter(|entry| entry.sender == Sender::Bot)
            .and_then(ChatEntry::options)
    }
}
