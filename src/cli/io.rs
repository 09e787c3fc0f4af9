//! Line input for the shell: rustyline on a terminal, stdin lines in script mode.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::mpsc as std_mpsc;

use dialoguer::{theme::ColorfulTheme, Input, Password};
use rustyline::{error::ReadlineError, DefaultEditor};
use tokio::sync::mpsc;

use crate::backend::Credentials;
use crate::errors::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

enum ReadEvent {
    Line(String),
    Closed,
    Failed(String),
}

enum Source {
    Interactive {
        prompts: std_mpsc::Sender<String>,
        lines: mpsc::UnboundedReceiver<ReadEvent>,
    },
    Script(VecDeque<String>),
}

/// Source of user lines. `None` means the user left (EOF or Ctrl-C).
pub struct LineSource {
    source: Source,
}

impl LineSource {
    pub fn for_mode(mode: CliMode) -> Result<Self, CliError> {
        match mode {
            CliMode::Interactive => Ok(Self::interactive()),
            CliMode::Script => {
                let lines = io::stdin().lock().lines().collect::<Result<_, _>>()?;
                Ok(Self {
                    source: Source::Script(lines),
                })
            }
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: Source::Script(lines.into_iter().map(Into::into).collect()),
        }
    }

    pub fn mode(&self) -> CliMode {
        match self.source {
            Source::Interactive { .. } => CliMode::Interactive,
            Source::Script(_) => CliMode::Script,
        }
    }

    /// The editor lives on a blocking thread and only reads when a prompt is sent.
    fn interactive() -> Self {
        let (prompt_tx, prompt_rx) = std_mpsc::channel::<String>();
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        tokio::task::spawn_blocking(move || {
            let mut editor = match DefaultEditor::new() {
                Ok(editor) => editor,
                Err(err) => {
                    let _ = line_tx.send(ReadEvent::Failed(err.to_string()));
                    return;
                }
            };
            while let Ok(prompt) = prompt_rx.recv() {
                let event = match editor.readline(&prompt) {
                    Ok(line) => {
                        if !line.trim().is_empty() {
                            let _ = editor.add_history_entry(line.as_str());
                        }
                        ReadEvent::Line(line)
                    }
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => ReadEvent::Closed,
                    Err(err) => ReadEvent::Failed(err.to_string()),
                };
                if line_tx.send(event).is_err() {
                    break;
                }
            }
        });
        Self {
            source: Source::Interactive {
                prompts: prompt_tx,
                lines: line_rx,
            },
        }
    }

    pub async fn next_line(&mut self, prompt: &str) -> Result<Option<String>, CliError> {
        match &mut self.source {
            Source::Script(lines) => Ok(lines.pop_front()),
            Source::Interactive { prompts, lines } => {
                if prompts.send(prompt.to_string()).is_err() {
                    return Ok(None);
                }
                match lines.recv().await {
                    Some(ReadEvent::Line(line)) => Ok(Some(line)),
                    Some(ReadEvent::Closed) | None => Ok(None),
                    Some(ReadEvent::Failed(message)) => Err(io::Error::other(message).into()),
                }
            }
        }
    }

    /// Email and password; dialoguer on a terminal, the next two lines otherwise.
    pub async fn credentials(&mut self) -> Result<Option<Credentials>, CliError> {
        match self.mode() {
            CliMode::Script => {
                let Some(email) = self.next_line("Email: ").await? else {
                    return Ok(None);
                };
                let Some(password) = self.next_line("Contraseña: ").await? else {
                    return Ok(None);
                };
                Ok(Some(Credentials::new(email.trim(), password)))
            }
            CliMode::Interactive => {
                let prompted = tokio::task::spawn_blocking(|| -> Result<Credentials, CliError> {
                    let theme = ColorfulTheme::default();
                    let email: String = Input::with_theme(&theme)
                        .with_prompt("Email")
                        .interact_text()?;
                    let password = Password::with_theme(&theme)
                        .with_prompt("Contraseña")
                        .interact()?;
                    Ok(Credentials::new(email.trim(), password))
                })
                .await??;
                Ok(Some(prompted))
            }
        }
    }
}
