//! Turn-based onboarding chat that collects one expense or savings goal.

pub mod input;
pub mod record;
mod scheduler;
pub mod script;
mod session;
pub mod step;
pub mod timeline;

pub use input::AmountRejection;
pub use record::{CollectedRecord, CompletedRecord, RecordType};
pub use scheduler::{CompletionCallback, QueueStatus};
pub use script::{Pacing, SessionMode};
pub use session::{DialogueSession, InputOutcome};
pub use step::{Step, TurnOutcome};
pub use timeline::{ChatEntry, EntryId, Presentation, Sender, SummaryCard};
