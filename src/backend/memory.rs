use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::dialogue::{CompletedRecord, RecordType};
use crate::errors::BackendError;

use super::{Backend, BackendResult, Credentials, Identity};

/// A record as stored by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub user_id: String,
    pub amount: f64,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    expenses: Vec<StoredRecord>,
    goals: Vec<StoredRecord>,
}

/// Demo backend: simulated sign-up latency, records kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    latency: Duration,
    tables: Mutex<Tables>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            tables: Mutex::new(Tables::default()),
        }
    }

    pub fn expenses(&self) -> Vec<StoredRecord> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .expenses
            .clone()
    }

    pub fn goals(&self) -> Vec<StoredRecord> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .goals
            .clone()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn authenticate(&self, credentials: &Credentials) -> BackendResult<Identity> {
        if credentials.email.trim().is_empty() {
            return Err(BackendError::InvalidCredentials("email is required".into()));
        }
        if credentials.password.is_empty() {
            return Err(BackendError::InvalidCredentials(
                "password is required".into(),
            ));
        }
        info!(email = %credentials.email, "simulating sign-up");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(Identity {
            id: Uuid::new_v4().to_string(),
            email: credentials.email.trim().to_string(),
        })
    }

    async fn persist(&self, owner: &Identity, record: &CompletedRecord) -> BackendResult<()> {
        info!(user = %owner.id, record_type = %record.record_type, "simulating record save");
        let row = StoredRecord {
            user_id: owner.id.clone(),
            amount: record.amount,
            category: record.category.clone(),
            created_at: Utc::now(),
        };
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        match record.record_type {
            RecordType::Expense => tables.expenses.push(row),
            RecordType::Goal => tables.goals.push(row),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "demo"
    }
}
