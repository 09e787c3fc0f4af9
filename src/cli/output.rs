use colored::Colorize;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::dialogue::{ChatEntry, Presentation, Sender};
use crate::onboarding::DashboardSummary;

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Section,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OutputPreferences {
    /// No colors, no typing indicator; used for piped transcripts.
    pub plain: bool,
    /// Echo user entries from the timeline (the terminal already shows typed lines).
    pub echo_user: bool,
}

static PREFERENCES: Lazy<RwLock<OutputPreferences>> =
    Lazy::new(|| RwLock::new(OutputPreferences::default()));

pub fn set_preferences(prefs: OutputPreferences) {
    colored::control::set_override(!prefs.plain);
    *PREFERENCES.write().unwrap_or_else(PoisonError::into_inner) = prefs;
}

fn preferences() -> OutputPreferences {
    *PREFERENCES.read().unwrap_or_else(PoisonError::into_inner)
}

fn apply_style(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()).bold().to_string(),
        MessageKind::Info => text,
        MessageKind::Success => format!("[ok] {text}").bright_green().to_string(),
        MessageKind::Warning => format!("[!] {text}").bright_yellow().to_string(),
        MessageKind::Error => format!("[x] {text}").bright_red().to_string(),
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = apply_style(kind, message);
    match kind {
        MessageKind::Section => println!("\n{}", formatted),
        MessageKind::Error => eprintln!("{}", formatted),
        _ => println!("{}", formatted),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Formats one timeline entry the way the shell prints it.
pub fn format_entry(entry: &ChatEntry) -> String {
    match (&entry.sender, &entry.presentation) {
        (Sender::User, _) => format!("> {}", entry.text).dimmed().to_string(),
        (Sender::Bot, Presentation::Plain) => format!("FinBot: {}", entry.text.cyan()),
        (Sender::Bot, Presentation::Options { options }) => {
            let chips: Vec<String> = options
                .iter()
                .enumerate()
                .map(|(idx, option)| format!("[{}] {}", idx + 1, option))
                .collect();
            format!(
                "FinBot: {}\n        {}",
                entry.text.cyan(),
                chips.join("  ").bright_magenta()
            )
        }
        (Sender::Bot, Presentation::Card { card }) => format!(
            "FinBot: {}\n        [{}] {}",
            entry.text.cyan(),
            card.label.to_uppercase().bright_green(),
            card.value.bold()
        ),
    }
}

/// Prints timeline entries that have not been shown yet.
#[derive(Debug, Default)]
pub struct TimelineRenderer {
    shown: usize,
    typing_shown: bool,
}

impl TimelineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_new(&mut self, entries: &[ChatEntry]) {
        let prefs = preferences();
        for entry in entries.iter().skip(self.shown) {
            if entry.sender == Sender::User && !prefs.echo_user {
                continue;
            }
            println!("{}", format_entry(entry));
            self.typing_shown = false;
        }
        self.shown = self.shown.max(entries.len());
    }

    pub fn typing(&mut self) {
        if preferences().plain || self.typing_shown {
            return;
        }
        println!("{}", "FinBot está escribiendo...".dimmed().italic());
        self.typing_shown = true;
    }
}

pub fn dashboard(name: &str, summary: &DashboardSummary) {
    section(format!("Hola, {}", name));
    info(format!(
        "{}: ${} - {}",
        summary.record_type.display_label(),
        summary.amount,
        summary.category
    ));
    info(format!("Proyección anual: ${}", summary.annual_projection));
    info(format!("Potencial de ahorro: ${}", summary.savings_potential));
}
