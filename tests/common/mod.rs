#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use finbot_core::dialogue::{
    ChatEntry, CompletedRecord, DialogueSession, Pacing, Sender, SessionMode,
};

/// Records every completion callback invocation.
#[derive(Clone, Default)]
pub struct CompletionRecorder {
    calls: Arc<Mutex<Vec<CompletedRecord>>>,
}

impl CompletionRecorder {
    pub fn start(&self, mode: SessionMode) -> DialogueSession {
        let calls = Arc::clone(&self.calls);
        DialogueSession::start(mode, Pacing::default(), move |record| {
            calls.lock().expect("recorder lock").push(record);
        })
    }

    pub fn calls(&self) -> Vec<CompletedRecord> {
        self.calls.lock().expect("recorder lock").clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().expect("recorder lock").len()
    }
}

pub fn texts(entries: &[ChatEntry]) -> Vec<String> {
    entries.iter().map(|entry| entry.text.clone()).collect()
}

pub fn bot_texts(entries: &[ChatEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.sender == Sender::Bot)
        .map(|entry| entry.text.clone())
        .collect()
}

/// Submits each line after the previous bot turns have settled.
pub async fn converse(session: &mut DialogueSession, lines: &[&str]) {
    session.settled().await;
    for line in lines {
        session.submit_input(line).expect("session open");
        session.settled().await;
    }
}
