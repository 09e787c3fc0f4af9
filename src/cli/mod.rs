//! Terminal chat shell hosting the onboarding dialogue.

pub mod io;
pub mod output;
mod shell;

pub use io::{CliMode, LineSource};
pub use shell::{run_cli, run_with, usage, CliOptions};
