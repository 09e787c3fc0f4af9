//! Host-side flow around a finished dialogue: account, persistence, dashboard figures.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{Backend, BackendResult, Credentials, Identity};
use crate::dialogue::{CompletedRecord, RecordType, SessionMode};

const MONTHS_PER_YEAR: f64 = 12.0;
const SAVINGS_RATE: f64 = 0.2;

/// Figures shown once a record is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub record_type: RecordType,
    pub amount: f64,
    pub category: String,
    pub annual_projection: f64,
    pub savings_potential: f64,
}

impl DashboardSummary {
    pub fn from_record(record: &CompletedRecord) -> Self {
        Self {
            record_type: record.record_type,
            amount: record.amount,
            category: record.category.clone(),
            annual_projection: record.amount * MONTHS_PER_YEAR,
            savings_potential: record.amount * SAVINGS_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// No identity yet: credentials are needed before the record can be stored.
    NeedsAccount,
    /// Signed in with nothing to store; the next chat runs in returning mode.
    AwaitingRecord,
    Dashboard(DashboardSummary),
}

/// Routes completed records to the backend, creating an identity first if needed.
pub struct OnboardingFlow {
    backend: Arc<dyn Backend>,
    identity: Option<Identity>,
    pending: Option<CompletedRecord>,
}

impl OnboardingFlow {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            identity: None,
            pending: None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn pending(&self) -> Option<&CompletedRecord> {
        self.pending.as_ref()
    }

    /// Mode for the next chat session.
    pub fn session_mode(&self) -> SessionMode {
        if self.identity.is_some() {
            SessionMode::Returning
        } else {
            SessionMode::FirstTime
        }
    }

    /// Handles a finished dialogue. Backend errors are returned untouched.
    ///
    /// The record stays pending until it is stored, so a failed write can be
    /// retried with [`Self::retry_pending`].
    pub async fn on_record(&mut self, record: CompletedRecord) -> BackendResult<NextStep> {
        self.pending = Some(record);
        match self.identity.clone() {
            Some(identity) => self.store_pending(&identity).await,
            None => {
                info!("record held until an account exists");
                Ok(NextStep::NeedsAccount)
            }
        }
    }

    /// Creates the account, then stores the record held by [`Self::on_record`].
    ///
    /// Signs up at most once: when an identity is already held only the write
    /// is attempted again.
    pub async fn register(&mut self, credentials: &Credentials) -> BackendResult<NextStep> {
        let identity = match self.identity.clone() {
            Some(identity) => identity,
            None => {
                let identity = self.backend.authenticate(credentials).await?;
                info!(user = %identity.id, backend = self.backend.name(), "account ready");
                self.identity = Some(identity.clone());
                identity
            }
        };
        self.store_pending(&identity).await
    }

    /// Retries storing the pending record under the current identity.
    pub async fn retry_pending(&mut self) -> BackendResult<NextStep> {
        match self.identity.clone() {
            Some(identity) => self.store_pending(&identity).await,
            None => Ok(NextStep::NeedsAccount),
        }
    }

    async fn store_pending(&mut self, identity: &Identity) -> BackendResult<NextStep> {
        let Some(record) = self.pending.clone() else {
            return Ok(NextStep::AwaitingRecord);
        };
        if let Err(err) = self.backend.persist(identity, &record).await {
            warn!(user = %identity.id, error = %err, "record kept pending");
            return Err(err);
        }
        self.pending = None;
        Ok(NextStep::Dashboard(DashboardSummary::from_record(&record)))
    }

    pub fn logout(&mut self) {
        self.identity = None;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_scales_monthly_amount() {
        let summary = DashboardSummary::from_record(&CompletedRecord {
            record_type: RecordType::Expense,
            amount: 50.0,
            category: "Comida".into(),
        });
        assert_eq!(summary.annual_projection, 600.0);
        assert_eq!(summary.savings_potential, 10.0);
    }
}
