//! Persistence and identity collaborators behind one capability trait.
//!
//! The dialogue engine never talks to a backend; the hosting flow does, after
//! completion. Which implementation runs is decided by configuration only.

pub mod memory;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{BackendConfig, BackendMode};
use crate::dialogue::CompletedRecord;
use crate::errors::{BackendError, ConfigError};

pub use memory::InMemoryBackend;
pub use remote::RemoteBackend;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Owner of persisted records, as returned by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl Identity {
    /// Part of the email before `@`, used as a greeting name.
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// Authentication and record storage.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> BackendResult<Identity>;

    async fn persist(&self, owner: &Identity, record: &CompletedRecord) -> BackendResult<()>;

    fn name(&self) -> &'static str;
}

/// Builds the backend selected by `config.mode`.
pub fn from_config(config: &BackendConfig) -> Result<Arc<dyn Backend>, ConfigError> {
    match config.mode {
        BackendMode::Demo => Ok(Arc::new(InMemoryBackend::with_latency(
            config.demo_latency(),
        ))),
        BackendMode::Remote => {
            let url = config
                .url
                .clone()
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingRemoteSetting("backend.url"))?;
            let key = config
                .anon_key
                .clone()
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingRemoteSetting("backend.anon_key"))?;
            Ok(Arc::new(RemoteBackend::new(url, key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_mode_requires_url_and_key() {
        let config = BackendConfig {
            mode: BackendMode::Remote,
            url: Some("https://example.supabase.co".into()),
            anon_key: None,
            demo_latency_ms: 0,
        };
        let err = from_config(&config).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::MissingRemoteSetting("backend.anon_key")
        ));
    }

    #[test]
    fn demo_mode_ignores_remote_settings() {
        let config = BackendConfig {
            mode: BackendMode::Demo,
            url: Some("https://real.supabase.co".into()),
            anon_key: Some("key".into()),
            demo_latency_ms: 0,
        };
        assert_eq!(from_config(&config).unwrap().name(), "demo");
    }

    #[test]
    fn display_name_strips_domain() {
        let identity = Identity {
            id: "1".into(),
            email: "ana@example.com".into(),
        };
        assert_eq!(identity.display_name(), "ana");
    }
}
