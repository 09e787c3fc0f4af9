use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::DialogueError;

use super::input;
use super::record::{CollectedRecord, CompletedRecord};
use super::scheduler::{lock, QueueStatus, Scheduler, Shared, SharedState};
use super::script::{Pacing, Script, SessionMode};
use super::step::{transition, Effect, Step, TurnOutcome};
use super::timeline::{ChatEntry, EntryDraft};

/// What happened to a submitted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Blank input: nothing echoed, nothing scheduled.
    Ignored,
    /// Accepted; the cursor moved to the contained step.
    Advanced(Step),
    /// Echoed but rejected; the current step prompts again.
    Retry(TurnOutcome),
    /// The flow already reached `Done`; input is disabled.
    Finished,
}

/// One onboarding conversation.
///
/// Owns the step cursor and the accumulator; the timeline is shared with the
/// scheduler task that reveals bot turns. Dropping the session tears it down.
pub struct DialogueSession {
    id: Uuid,
    script: Script,
    step: Step,
    record: CollectedRecord,
    shared: SharedState,
    scheduler: Scheduler,
    closed: bool,
}

impl DialogueSession {
    /// Starts a session and schedules the greeting for `mode`.
    ///
    /// Must be called from within a tokio runtime. `on_complete` runs at most
    /// once, on the scheduler task, after the closing messages are visible.
    pub fn start<F>(mode: SessionMode, pacing: Pacing, on_complete: F) -> Self
    where
        F: FnOnce(CompletedRecord) + Send + 'static,
    {
        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(Shared::new(Box::new(on_complete))));
        let scheduler = Scheduler::spawn(Arc::clone(&shared), id);
        let script = Script::new(mode, pacing);

        for turn in script.greeting() {
            scheduler.say(turn);
        }
        info!(session = %id, ?mode, "dialogue session started");

        Self {
            id,
            script,
            step: Step::AskType,
            record: CollectedRecord::new(),
            shared,
            scheduler,
            closed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> SessionMode {
        self.script.mode()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn record(&self) -> &CollectedRecord {
        &self.record
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feeds typed text (or a chip label) to the current step.
    pub fn submit_input(&mut self, text: &str) -> Result<InputOutcome, DialogueError> {
        if self.closed || self.scheduler.is_cancelled() {
            return Err(DialogueError::SessionClosed);
        }
        let Some(text) = input::normalize(text) else {
            return Ok(InputOutcome::Ignored);
        };
        if !self.step.accepts_input() {
            return Ok(InputOutcome::Finished);
        }

        lock(&self.shared).timeline.append(EntryDraft::user(text));

        let result = transition(self.step, &self.record, &self.script, text);
        for effect in result.effects {
            self.apply(effect)?;
        }
        debug!(session = %self.id, from = ?self.step, to = ?result.next, outcome = ?result.outcome, "step transition");
        self.step = result.next;

        Ok(match result.outcome {
            TurnOutcome::Advanced => InputOutcome::Advanced(self.step),
            TurnOutcome::Refused => InputOutcome::Finished,
            retry => InputOutcome::Retry(retry),
        })
    }

    /// Submits the label of chip `index` on the latest bot message.
    pub fn select_option(&mut self, index: usize) -> Result<InputOutcome, DialogueError> {
        let label = {
            let guard = lock(&self.shared);
            guard
                .timeline
                .current_options()
                .and_then(|options| options.get(index).cloned())
        };
        match label {
            Some(label) => self.submit_input(&label),
            None => Err(DialogueError::NoSuchOption(index)),
        }
    }

    fn apply(&mut self, effect: Effect) -> Result<(), DialogueError> {
        match effect {
            Effect::SetRecordType(record_type) => self.record.set_record_type(record_type),
            Effect::SetAmount(amount) => self.record.set_amount(amount),
            Effect::SetCategory(category) => self.record.set_category(category),
            Effect::Say(turn) => {
                self.scheduler.say(turn);
                Ok(())
            }
            Effect::Complete { record, after } => {
                self.scheduler.complete(record, after);
                Ok(())
            }
        }
    }

    /// Read-only copy of the visible timeline.
    pub fn timeline(&self) -> Vec<ChatEntry> {
        lock(&self.shared).timeline.entries().to_vec()
    }

    /// Chip labels offered by the latest bot message, if any.
    pub fn current_options(&self) -> Option<Vec<String>> {
        lock(&self.shared).timeline.current_options().map(<[String]>::to_vec)
    }

    /// Stream of entries as they are appended.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEntry> {
        lock(&self.shared).timeline.subscribe()
    }

    pub fn is_composing(&self) -> bool {
        self.scheduler.status().is_composing()
    }

    pub fn status(&self) -> QueueStatus {
        self.scheduler.status()
    }

    pub fn watch_status(&self) -> watch::Receiver<QueueStatus> {
        self.scheduler.watch()
    }

    /// Resolves once every scheduled turn (and a pending completion) has run.
    pub async fn settled(&self) {
        let mut status = self.scheduler.watch();
        // A dropped sender means the session is gone; nothing left to wait on.
        let _ = status.wait_for(QueueStatus::is_idle).await;
    }

    /// Cancels pending turns and suppresses a completion that has not fired yet.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        {
            let mut guard = lock(&self.shared);
            guard.timeline.close();
            guard.on_complete = None;
        }
        self.scheduler.cancel();
        info!(session = %self.id, step = ?self.step, "dialogue session torn down");
    }
}

impl Drop for DialogueSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
