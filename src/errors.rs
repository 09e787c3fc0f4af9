use thiserror::Error;

/// Failures surfaced by the dialogue engine itself.
///
/// Rejected user input is not an error: unrecognised branches, invalid amounts
/// and blank lines are reported through [`crate::dialogue::InputOutcome`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogueError {
    #[error("dialogue session is closed")]
    SessionClosed,
    #[error("no option #{0} on the latest message")]
    NoSuchOption(usize),
    #[error("record field `{0}` set out of order")]
    OutOfOrder(&'static str),
}

/// Errors returned by the persistence and identity collaborators.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("backend response did not include a user identity")]
    MissingIdentity,
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("remote backend requires `{0}` to be configured")]
    MissingRemoteSetting(&'static str),
    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Top-level error for the chat shell.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Dialogue(#[from] DialogueError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("input task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
