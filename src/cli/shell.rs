use std::env;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::backend::{self, BackendResult};
use crate::config::{Config, ConfigManager};
use crate::dialogue::{CompletedRecord, DialogueSession, InputOutcome, Pacing, SessionMode};
use crate::errors::CliError;
use crate::onboarding::{NextStep, OnboardingFlow};

use super::io::{CliMode, LineSource};
use super::output::{self, OutputPreferences, TimelineRenderer};

const QUIT_COMMAND: &str = "/quit";
const LOGOUT_COMMAND: &str = "logout";
const RETRY_COMMAND: &str = "reintentar";
const PROMPT: &str = "> ";

/// Parsed command-line switches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub instant: bool,
    pub help: bool,
}

impl CliOptions {
    pub fn parse<I, S>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = CliOptions::default();
        for arg in args {
            match arg.as_ref() {
                "chat" => {}
                "--instant" => options.instant = true,
                "-h" | "--help" => options.help = true,
                other => return Err(format!("unknown argument `{other}`")),
            }
        }
        Ok(options)
    }
}

pub fn usage() -> &'static str {
    "Usage: finbot_cli [chat] [--instant]\n\
     Chat with FinBot to register an expense or a savings goal.\n  \
     --instant   skip typing delays\n\
     Type the number of an option to pick it, or /quit to leave.\n\
     After a record is saved: 'nuevo' starts another chat, 'logout' signs out."
}

pub async fn run_cli(options: CliOptions) -> Result<(), CliError> {
    let mode = if env::var_os("FINBOT_CLI_SCRIPT").is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };
    output::set_preferences(OutputPreferences {
        plain: mode == CliMode::Script,
        echo_user: mode == CliMode::Script,
    });

    let mut config = ConfigManager::new()?.resolve()?;
    if options.instant {
        config.pacing = Pacing::instant();
    }
    let mut input = LineSource::for_mode(mode)?;
    run_with(&config, &mut input).await
}

/// Runs chats until the user leaves. Separated from [`run_cli`] so tests can
/// drive it with scripted lines and a custom config.
pub async fn run_with(config: &Config, input: &mut LineSource) -> Result<(), CliError> {
    let backend = backend::from_config(&config.backend)?;
    let mut flow = OnboardingFlow::new(backend);

    loop {
        let Some(record) = run_chat(flow.session_mode(), config.pacing, input).await? else {
            output::info("¡Hasta pronto!");
            return Ok(());
        };

        let outcome = flow.on_record(record).await;
        if !store_record(&mut flow, outcome, input).await? {
            output::info("¡Hasta pronto!");
            return Ok(());
        }

        output::info(
            "Escribe 'nuevo' para registrar otro movimiento, 'logout' para cerrar sesión o 'salir' para terminar.",
        );
        match input.next_line(PROMPT).await? {
            Some(line) if line.trim().eq_ignore_ascii_case("nuevo") => continue,
            Some(line) if line.trim().eq_ignore_ascii_case(LOGOUT_COMMAND) => {
                flow.logout();
                output::info("Sesión cerrada.");
            }
            _ => {
                output::info("¡Hasta pronto!");
                return Ok(());
            }
        }
    }
}

/// Drives the hosting flow until the record is stored or set aside.
/// Returns `false` when the user left while being asked for input.
async fn store_record(
    flow: &mut OnboardingFlow,
    mut outcome: BackendResult<NextStep>,
    input: &mut LineSource,
) -> Result<bool, CliError> {
    loop {
        match outcome {
            Ok(NextStep::Dashboard(summary)) => {
                if let Some(identity) = flow.identity() {
                    output::dashboard(identity.display_name(), &summary);
                }
                return Ok(true);
            }
            Ok(NextStep::AwaitingRecord) => return Ok(true),
            Ok(NextStep::NeedsAccount) => {
                output::section("Guarda tu Plan");
                let Some(credentials) = input.credentials().await? else {
                    return Ok(false);
                };
                let signed_in = flow.identity().is_some();
                outcome = flow.register(&credentials).await;
                if !signed_in && flow.identity().is_some() {
                    output::success("Cuenta creada.");
                }
            }
            Err(err) if flow.identity().is_none() => {
                warn!(error = %err, "registration failed");
                output::error(format!("Error al registrarse: {err}"));
                outcome = Ok(NextStep::NeedsAccount);
            }
            Err(err) => {
                warn!(error = %err, "record not stored");
                output::error(format!("No se pudo guardar el registro: {err}"));
                output::info(format!(
                    "Escribe '{RETRY_COMMAND}' para intentarlo de nuevo o cualquier otra cosa para continuar."
                ));
                match input.next_line(PROMPT).await? {
                    Some(line) if line.trim().eq_ignore_ascii_case(RETRY_COMMAND) => {
                        outcome = flow.retry_pending().await;
                    }
                    Some(_) => {
                        output::warning("El registro no se guardó.");
                        return Ok(true);
                    }
                    None => return Ok(false),
                }
            }
        }
    }
}

/// One dialogue session. Returns `None` when the user leaves before completion.
async fn run_chat(
    mode: SessionMode,
    pacing: Pacing,
    input: &mut LineSource,
) -> Result<Option<CompletedRecord>, CliError> {
    let (done_tx, mut done_rx) = oneshot::channel();
    let mut session = DialogueSession::start(mode, pacing, move |record| {
        let _ = done_tx.send(record);
    });
    let mut renderer = TimelineRenderer::new();

    loop {
        follow(&session, &mut renderer).await;
        if let Ok(record) = done_rx.try_recv() {
            return Ok(Some(record));
        }

        let line = match input.next_line(PROMPT).await? {
            Some(line) if line.trim() != QUIT_COMMAND => line,
            _ => {
                debug!(session = %session.id(), step = ?session.step(), "chat left early");
                session.teardown();
                return Ok(None);
            }
        };

        let outcome = match chip_index(&session, &line) {
            Some(index) => session.select_option(index)?,
            None => session.submit_input(&line)?,
        };
        if outcome == InputOutcome::Finished {
            output::warning("La conversación ya terminó.");
        }
    }
}

/// Maps "1", "2", ... to the chips of the latest bot message.
fn chip_index(session: &DialogueSession, line: &str) -> Option<usize> {
    let number: usize = line.trim().parse().ok()?;
    let options = session.current_options()?;
    (1..=options.len()).contains(&number).then(|| number - 1)
}

/// Prints entries as they appear until every scheduled turn has run.
async fn follow(session: &DialogueSession, renderer: &mut TimelineRenderer) {
    let mut status = session.watch_status();
    loop {
        renderer.render_new(&session.timeline());
        let current = *status.borrow_and_update();
        if current.is_idle() {
            break;
        }
        if current.is_composing() {
            renderer.typing();
        }
        if status.changed().await.is_err() {
            break;
        }
    }
    renderer.render_new(&session.timeline());
}
