mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::CompletionRecorder;
use finbot_core::backend::{Backend, BackendResult, Credentials, Identity, InMemoryBackend};
use finbot_core::dialogue::{CompletedRecord, RecordType, SessionMode};
use finbot_core::errors::BackendError;
use finbot_core::onboarding::{NextStep, OnboardingFlow};

fn expense(amount: f64, category: &str) -> CompletedRecord {
    CompletedRecord {
        record_type: RecordType::Expense,
        amount,
        category: category.into(),
    }
}

/// Counts sign-ups and refuses the first write.
#[derive(Default)]
struct FlakyStore {
    signups: AtomicUsize,
    failed_once: AtomicBool,
    inner: InMemoryBackend,
}

impl FlakyStore {
    fn signups(&self) -> usize {
        self.signups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for FlakyStore {
    async fn authenticate(&self, credentials: &Credentials) -> BackendResult<Identity> {
        self.signups.fetch_add(1, Ordering::SeqCst);
        self.inner.authenticate(credentials).await
    }

    async fn persist(&self, owner: &Identity, record: &CompletedRecord) -> BackendResult<()> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(BackendError::Rejected {
                status: 503,
                message: "unavailable".into(),
            });
        }
        self.inner.persist(owner, record).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn first_record_waits_for_an_account() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut flow = OnboardingFlow::new(backend.clone());
    assert_eq!(flow.session_mode(), SessionMode::FirstTime);

    let next = flow.on_record(expense(50.0, "Comida")).await.unwrap();
    assert_eq!(next, NextStep::NeedsAccount);
    assert!(flow.pending().is_some());
    assert!(backend.expenses().is_empty());

    let next = flow
        .register(&Credentials::new("ana@example.com", "secret"))
        .await
        .unwrap();
    let NextStep::Dashboard(summary) = next else {
        panic!("expected dashboard, got {next:?}");
    };
    assert_eq!(summary.annual_projection, 600.0);
    assert!(flow.pending().is_none());
    assert_eq!(flow.session_mode(), SessionMode::Returning);

    let stored = backend.expenses();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].category, "Comida");
    assert_eq!(Some(&stored[0].user_id), flow.identity().map(|id| &id.id));
}

#[tokio::test]
async fn returning_records_are_stored_directly() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut flow = OnboardingFlow::new(backend.clone());
    flow.register(&Credentials::new("ana@example.com", "secret"))
        .await
        .unwrap();

    let goal = CompletedRecord {
        record_type: RecordType::Goal,
        amount: 200.0,
        category: "Viaje".into(),
    };
    let next = flow.on_record(goal).await.unwrap();
    assert!(matches!(next, NextStep::Dashboard(_)));
    assert_eq!(backend.goals().len(), 1);
    assert!(backend.expenses().is_empty());
}

#[tokio::test]
async fn rejected_credentials_keep_record_pending() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut flow = OnboardingFlow::new(backend.clone());
    flow.on_record(expense(10.0, "Ocio")).await.unwrap();

    let err = flow
        .register(&Credentials::new("ana@example.com", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidCredentials(_)));
    assert!(flow.identity().is_none());
    assert_eq!(flow.pending(), Some(&expense(10.0, "Ocio")));
}

#[tokio::test]
async fn failed_write_after_sign_up_does_not_sign_up_again() {
    let backend = Arc::new(FlakyStore::default());
    let mut flow = OnboardingFlow::new(backend.clone());
    flow.on_record(expense(30.0, "Hogar")).await.unwrap();

    let credentials = Credentials::new("ana@example.com", "secret");
    assert!(flow.register(&credentials).await.is_err());
    assert!(flow.pending().is_some());
    let first_id = flow.identity().expect("signed up").id.clone();

    let next = flow.register(&credentials).await.unwrap();
    assert!(matches!(next, NextStep::Dashboard(_)));
    assert_eq!(backend.signups(), 1);
    assert_eq!(flow.identity().map(|id| id.id.clone()), Some(first_id.clone()));

    let stored = backend.inner.expenses();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].user_id, first_id);
    assert!(flow.pending().is_none());
}

#[tokio::test]
async fn returning_write_failure_can_be_retried() {
    let backend = Arc::new(FlakyStore::default());
    let mut flow = OnboardingFlow::new(backend.clone());
    let next = flow
        .register(&Credentials::new("ana@example.com", "secret"))
        .await
        .unwrap();
    assert_eq!(next, NextStep::AwaitingRecord);

    let err = flow.on_record(expense(12.0, "Transporte")).await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected { status: 503, .. }));
    assert_eq!(flow.pending(), Some(&expense(12.0, "Transporte")));

    let next = flow.retry_pending().await.unwrap();
    assert!(matches!(next, NextStep::Dashboard(_)));
    assert_eq!(backend.signups(), 1);
    assert_eq!(backend.inner.expenses().len(), 1);
    assert_eq!(flow.retry_pending().await.unwrap(), NextStep::AwaitingRecord);
}

#[tokio::test]
async fn retry_without_account_asks_for_one() {
    let mut flow = OnboardingFlow::new(Arc::new(InMemoryBackend::new()));
    flow.on_record(expense(5.0, "Ocio")).await.unwrap();
    assert_eq!(flow.retry_pending().await.unwrap(), NextStep::NeedsAccount);
}

#[tokio::test]
async fn logout_returns_to_first_time_mode() {
    let mut flow = OnboardingFlow::new(Arc::new(InMemoryBackend::new()));
    let next = flow
        .register(&Credentials::new("ana@example.com", "secret"))
        .await
        .unwrap();
    assert_eq!(next, NextStep::AwaitingRecord);
    assert_eq!(flow.session_mode(), SessionMode::Returning);

    flow.logout();
    assert_eq!(flow.session_mode(), SessionMode::FirstTime);
}

#[tokio::test(start_paused = true)]
async fn completed_dialogue_feeds_onboarding() {
    let recorder = CompletionRecorder::default();
    let mut session = recorder.start(SessionMode::FirstTime);
    common::converse(&mut session, &["Definir Meta", "$1,200", "Auto"]).await;
    let record = recorder.calls().pop().expect("completion fired");

    let backend = Arc::new(InMemoryBackend::new());
    let mut flow = OnboardingFlow::new(backend.clone());
    assert_eq!(flow.on_record(record).await.unwrap(), NextStep::NeedsAccount);
    flow.register(&Credentials::new("luis@example.com", "pw"))
        .await
        .unwrap();

    let goals = backend.goals();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].amount, 1200.0);
    assert_eq!(goals[0].category, "Auto");
}
