//! Linear collection protocol: `AskType -> AskAmount -> AskCategory -> Done`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::input::{self, AmountRejection};
use super::record::{CollectedRecord, CompletedRecord, RecordType};
use super::script::{BotTurn, Script};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    AskType,
    AskAmount,
    AskCategory,
    Done,
}

impl Step {
    pub fn accepts_input(self) -> bool {
        !matches!(self, Step::Done)
    }
}

/// A side effect requested by [`transition`], applied in order by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SetRecordType(RecordType),
    SetAmount(f64),
    SetCategory(String),
    Say(BotTurn),
    /// Fire the completion callback `after` the preceding turns are visible.
    Complete {
        record: CompletedRecord,
        after: Duration,
    },
}

/// Result of feeding one input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: Step,
    pub effects: Vec<Effect>,
    pub outcome: TurnOutcome,
}

/// How the current step judged the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Advanced,
    UnrecognizedBranch,
    InvalidAmount(AmountRejection),
    Refused,
}

impl Transition {
    fn stay(step: Step, outcome: TurnOutcome, effects: Vec<Effect>) -> Self {
        Self {
            next: step,
            effects,
            outcome,
        }
    }

    fn advance(next: Step, effects: Vec<Effect>) -> Self {
        Self {
            next,
            effects,
            outcome: TurnOutcome::Advanced,
        }
    }
}

/// Pure transition function over `(step, record, input)`.
///
/// `input` must already be normalized (non-blank). The record is only read
/// here; every mutation is expressed as an [`Effect`].
pub fn transition(
    step: Step,
    record: &CollectedRecord,
    script: &Script,
    input: &str,
) -> Transition {
    match step {
        Step::AskType => match input::match_branch(input) {
            Some(record_type) => Transition::advance(
                Step::AskAmount,
                vec![
                    Effect::SetRecordType(record_type),
                    Effect::Say(script.amount_prompt(record_type)),
                ],
            ),
            None => Transition::stay(
                step,
                TurnOutcome::UnrecognizedBranch,
                vec![Effect::Say(script.branch_retry())],
            ),
        },
        Step::AskAmount => {
            let Some(record_type) = record.record_type() else {
                return Transition::stay(step, TurnOutcome::Refused, Vec::new());
            };
            match input::parse_amount(input) {
                Ok(amount) => Transition::advance(
                    Step::AskCategory,
                    vec![
                        Effect::SetAmount(amount),
                        Effect::Say(script.category_prompt(record_type, amount)),
                    ],
                ),
                Err(reason) => Transition::stay(
                    step,
                    TurnOutcome::InvalidAmount(reason),
                    vec![Effect::Say(script.amount_retry())],
                ),
            }
        }
        Step::AskCategory => {
            let (Some(record_type), Some(amount)) = (record.record_type(), record.amount())
            else {
                return Transition::stay(step, TurnOutcome::Refused, Vec::new());
            };
            let finished = CompletedRecord {
                record_type,
                amount,
                category: input.to_string(),
            };
            Transition::advance(
                Step::Done,
                vec![
                    Effect::SetCategory(finished.category.clone()),
                    Effect::Say(
                        script.summary_card(record_type.display_label(), finished.summary_value()),
                    ),
                    Effect::Say(script.closing()),
                    Effect::Complete {
                        after: script.completion_delay(),
                        record: finished,
                    },
                ],
            )
        }
        Step::Done => Transition::stay(step, TurnOutcome::Refused, Vec::new()),
    }
}
