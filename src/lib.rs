#![doc(test(attr(deny(warnings))))]

//! FinBot core: the onboarding chat that collects a single expense or savings
//! goal, plus the collaborators and shell that host it.

pub mod backend;
pub mod cli;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod onboarding;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("FinBot core tracing initialized.");
    });
}
