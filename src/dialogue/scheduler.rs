//! Ordered, cancellable delivery of bot turns and the completion handoff.
//!
//! Turns are queued in the order the state machine decides them and drained by
//! a single task: each turn waits its own delay only once it reaches the head
//! of the queue, so visibility order equals scheduling order whatever the
//! individual delays are. Cancelling the token stops the drain without
//! touching the timeline again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::record::CompletedRecord;
use super::script::BotTurn;
use super::timeline::Timeline;

pub type CompletionCallback = Box<dyn FnOnce(CompletedRecord) + Send + 'static>;

/// State shared between a session and its drain task.
pub(crate) struct Shared {
    pub(crate) timeline: Timeline,
    pub(crate) on_complete: Option<CompletionCallback>,
}

impl Shared {
    pub(crate) fn new(on_complete: CompletionCallback) -> Self {
        Self {
            timeline: Timeline::new(),
            on_complete: Some(on_complete),
        }
    }
}

pub(crate) type SharedState = Arc<Mutex<Shared>>;

pub(crate) fn lock(shared: &SharedState) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of the pending queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatus {
    /// Items not yet processed, including a pending completion.
    pub queued: usize,
    /// Bot messages not yet visible; drives the typing indicator.
    pub typing: usize,
}

impl QueueStatus {
    pub fn is_composing(&self) -> bool {
        self.typing > 0
    }

    pub fn is_idle(&self) -> bool {
        self.queued == 0
    }
}

#[derive(Debug)]
enum PendingTurn {
    Reveal(BotTurn),
    Complete {
        record: CompletedRecord,
        after: Duration,
    },
}

impl PendingTurn {
    fn delay(&self) -> Duration {
        match self {
            PendingTurn::Reveal(turn) => turn.delay,
            PendingTurn::Complete { after, .. } => *after,
        }
    }

    fn is_reveal(&self) -> bool {
        matches!(self, PendingTurn::Reveal(_))
    }
}

pub(crate) struct Scheduler {
    queue: mpsc::UnboundedSender<PendingTurn>,
    status: Arc<watch::Sender<QueueStatus>>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Spawns the drain task on the current tokio runtime.
    pub(crate) fn spawn(shared: SharedState, session_id: Uuid) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(QueueStatus::default());
        let status = Arc::new(status);
        let token = CancellationToken::new();
        let task = tokio::spawn(drain(
            receiver,
            shared,
            Arc::clone(&status),
            token.clone(),
            session_id,
        ));
        Self {
            queue,
            status,
            token,
            task,
        }
    }

    pub(crate) fn say(&self, turn: BotTurn) -> bool {
        self.enqueue(PendingTurn::Reveal(turn))
    }

    pub(crate) fn complete(&self, record: CompletedRecord, after: Duration) -> bool {
        self.enqueue(PendingTurn::Complete { record, after })
    }

    fn enqueue(&self, turn: PendingTurn) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let reveal = turn.is_reveal();
        self.status.send_modify(|status| {
            status.queued += 1;
            if reveal {
                status.typing += 1;
            }
        });
        if self.queue.send(turn).is_err() {
            self.status.send_modify(|status| {
                status.queued = status.queued.saturating_sub(1);
                if reveal {
                    status.typing = status.typing.saturating_sub(1);
                }
            });
            return false;
        }
        true
    }

    pub(crate) fn status(&self) -> QueueStatus {
        *self.status.borrow()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<QueueStatus> {
        self.status.subscribe()
    }

    /// Stops the drain task; nothing queued is delivered afterwards.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
        self.task.abort();
        self.status.send_replace(QueueStatus::default());
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

async fn drain(
    mut receiver: mpsc::UnboundedReceiver<PendingTurn>,
    shared: SharedState,
    status: Arc<watch::Sender<QueueStatus>>,
    token: CancellationToken,
    session_id: Uuid,
) {
    loop {
        let turn = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = receiver.recv() => match next {
                Some(turn) => turn,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(turn.delay()) => {}
        }

        let reveal = turn.is_reveal();
        match turn {
            PendingTurn::Reveal(bot) => {
                let mut guard = lock(&shared);
                if guard.timeline.is_closed() {
                    break;
                }
                if let Some(entry) = guard.timeline.append(bot.draft) {
                    debug!(session = %session_id, entry = %entry.id, "bot turn visible");
                }
            }
            PendingTurn::Complete { record, .. } => {
                let callback = {
                    let mut guard = lock(&shared);
                    if guard.timeline.is_closed() {
                        break;
                    }
                    guard.on_complete.take()
                };
                if let Some(callback) = callback {
                    info!(session = %session_id, record_type = %record.record_type, "dialogue completed");
                    callback(record);
                }
            }
        }

        status.send_modify(|status| {
            status.queued = status.queued.saturating_sub(1);
            if reveal {
                status.typing = status.typing.saturating_sub(1);
            }
        });
    }
    debug!(session = %session_id, "scheduler drain stopped");
}
