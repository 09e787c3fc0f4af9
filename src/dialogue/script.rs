//! Bot wording and typing delays for each session mode.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::record::RecordType;
use super::timeline::EntryDraft;

/// Selects the greeting script and the closing sequence. Fixed at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    FirstTime,
    Returning,
}

pub const EXPENSE_CATEGORIES: [&str; 4] = ["Comida", "Transporte", "Hogar", "Ocio"];
pub const GOAL_CATEGORIES: [&str; 4] = ["Emergencias", "Viaje", "Inversión", "Auto"];

const DEFAULT_DELAY_MS: u64 = 500;
const GREETING_DELAY_MS: u64 = 100;
const CATEGORY_PROMPT_DELAY_MS: u64 = 800;
const CARD_DELAY_MS: u64 = 500;

/// A bot message paired with the typing time shown before it appears.
#[derive(Debug, Clone, PartialEq)]
pub struct BotTurn {
    pub delay: Duration,
    pub draft: EntryDraft,
}

/// Multiplier applied to every scripted delay; `0.0` makes the chat instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pacing {
    pub scale: f64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl Pacing {
    /// Largest accepted scale; keeps every scripted delay under a few minutes.
    pub const MAX_SCALE: f64 = 100.0;

    pub fn instant() -> Self {
        Self { scale: 0.0 }
    }

    pub fn is_valid(&self) -> bool {
        self.scale.is_finite() && (0.0..=Self::MAX_SCALE).contains(&self.scale)
    }

    pub fn delay(&self, millis: u64) -> Duration {
        let scale = if self.scale.is_finite() && self.scale > 0.0 {
            self.scale.min(Self::MAX_SCALE)
        } else {
            0.0
        };
        Duration::try_from_secs_f64(millis as f64 * scale / 1000.0).unwrap_or(Duration::MAX)
    }
}

/// Produces the bot turns for one session.
#[derive(Debug, Clone, Copy)]
pub struct Script {
    mode: SessionMode,
    pacing: Pacing,
}

impl Script {
    pub fn new(mode: SessionMode, pacing: Pacing) -> Self {
        Self { mode, pacing }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    fn turn(&self, millis: u64, draft: EntryDraft) -> BotTurn {
        BotTurn {
            delay: self.pacing.delay(millis),
            draft,
        }
    }

    pub fn branch_options(&self) -> [&'static str; 2] {
        match self.mode {
            SessionMode::FirstTime => ["Registrar Gasto", "Definir Meta"],
            SessionMode::Returning => ["Nuevo Gasto", "Nueva Meta"],
        }
    }

    pub fn greeting(&self) -> Vec<BotTurn> {
        let options = self.branch_options();
        match self.mode {
            SessionMode::FirstTime => vec![
                self.turn(
                    GREETING_DELAY_MS,
                    EntryDraft::bot("¡Hola! Soy FinBot. 🤖 Vamos a organizar tus finanzas."),
                ),
                self.turn(
                    2400,
                    EntryDraft::bot("¿Qué deseas registrar hoy?").with_options(options),
                ),
            ],
            SessionMode::Returning => vec![
                self.turn(
                    GREETING_DELAY_MS,
                    EntryDraft::bot("¡Hola de nuevo! 👋 ¿Qué registramos ahora?"),
                ),
                self.turn(
                    1300,
                    EntryDraft::bot("Selecciona una opción:").with_options(options),
                ),
            ],
        }
    }

    pub fn branch_retry(&self) -> BotTurn {
        self.turn(
            DEFAULT_DELAY_MS,
            EntryDraft::bot("Por favor selecciona una opción.").with_options(self.branch_options()),
        )
    }

    pub fn amount_prompt(&self, record_type: RecordType) -> BotTurn {
        let text = match record_type {
            RecordType::Expense => "Entendido. ¿De cuánto fue el gasto? (Solo números)",
            RecordType::Goal => "¡Excelente! ¿Cuál es tu objetivo mensual?",
        };
        self.turn(DEFAULT_DELAY_MS, EntryDraft::bot(text))
    }

    pub fn amount_retry(&self) -> BotTurn {
        self.turn(
            DEFAULT_DELAY_MS,
            EntryDraft::bot("Número no válido. Intenta de nuevo."),
        )
    }

    pub fn category_prompt(&self, record_type: RecordType, amount: f64) -> BotTurn {
        let draft = match record_type {
            RecordType::Expense => EntryDraft::bot(format!("Monto: ${amount}. ¿Categoría?"))
                .with_options(EXPENSE_CATEGORIES),
            RecordType::Goal => EntryDraft::bot(format!("Meta: ${amount}. ¿Para qué es?"))
                .with_options(GOAL_CATEGORIES),
        };
        self.turn(CATEGORY_PROMPT_DELAY_MS, draft)
    }

    pub fn summary_card(&self, label: &str, value: String) -> BotTurn {
        self.turn(CARD_DELAY_MS, EntryDraft::bot("Guardado:").with_card(label, value))
    }

    pub fn closing(&self) -> BotTurn {
        match self.mode {
            SessionMode::Returning => {
                self.turn(1000, EntryDraft::bot("Actualizando tu dashboard..."))
            }
            SessionMode::FirstTime => self.turn(
                1500,
                EntryDraft::bot(
                    "He creado tu proyección. Crea tu cuenta para ver el análisis completo.",
                ),
            ),
        }
    }

    /// Wait between the closing message becoming visible and the completion callback.
    pub fn completion_delay(&self) -> Duration {
        match self.mode {
            SessionMode::Returning => self.pacing.delay(1000),
            SessionMode::FirstTime => self.pacing.delay(2000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::timeline::Presentation;

    #[test]
    fn first_time_closes_slower_than_returning() {
        let pacing = Pacing::default();
        let first = Script::new(SessionMode::FirstTime, pacing);
        let returning = Script::new(SessionMode::Returning, pacing);
        assert!(first.completion_delay() > returning.completion_delay());
        assert!(first.closing().delay > returning.closing().delay);
    }

    #[test]
    fn category_options_follow_record_type() {
        let script = Script::new(SessionMode::FirstTime, Pacing::default());
        let turn = script.category_prompt(RecordType::Goal, 200.0);
        assert_eq!(turn.draft.text, "Meta: $200. ¿Para qué es?");
        match turn.draft.presentation {
            Presentation::Options { options } => assert_eq!(options, GOAL_CATEGORIES),
            other => panic!("expected options, got {:?}", other),
        }
    }

    #[test]
    fn zero_scale_removes_delays() {
        let script = Script::new(SessionMode::FirstTime, Pacing::instant());
        assert!(script.greeting().iter().all(|turn| turn.delay.is_zero()));
        assert!(script.completion_delay().is_zero());
    }

    #[test]
    fn oversized_scale_is_clamped() {
        let huge = Pacing { scale: 1e300 };
        assert!(!huge.is_valid());
        assert_eq!(huge.delay(100), Duration::from_secs(10));

        let script = Script::new(SessionMode::FirstTime, huge);
        assert!(script.greeting().iter().all(|turn| turn.delay <= Duration::from_secs(240)));
        assert!(Pacing { scale: f64::NAN }.delay(100).is_zero());
    }

    #[test]
    fn returning_greeting_offers_returning_chips() {
        let script = Script::new(SessionMode::Returning, Pacing::default());
        let last = script.greeting().pop().unwrap();
        assert_eq!(
            last.draft.presentation,
            Presentation::Options {
                options: vec!["Nuevo Gasto".into(), "Nueva Meta".into()]
            }
        );
    }
}
