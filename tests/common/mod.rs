#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldops_outbox::application::ports::{
    IngestAck, IngestGateway, IngestSubmission, OutboxStore,
};
use fieldops_outbox::domain::entities::outbox::TaskUpdatePayload;
use fieldops_outbox::domain::entities::{ActorContext, EventPayload};
use fieldops_outbox::infrastructure::database::{ConnectionPool, SqliteOutboxStore};
use fieldops_outbox::shared::SubmissionError;
use tokio::sync::Mutex;

pub const TEST_ORG: &str = "org-field";
pub const TEST_USER: &str = "supervisor-1";

pub async fn setup_store() -> Arc<dyn OutboxStore> {
    let pool = ConnectionPool::from_memory()
        .await
        .expect("in-memory sqlite");
    let store: Arc<dyn OutboxStore> = Arc::new(SqliteOutboxStore::new(pool));
    let report = store.initialize().await.expect("initialize outbox");
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    store
}

pub fn actor() -> ActorContext {
    ActorContext::new(TEST_ORG, TEST_USER).expect("actor")
}

pub fn task_fields(task_id: &str, status: &str) -> TaskUpdatePayload {
    TaskUpdatePayload {
        task_id: task_id.to_string(),
        project_id: Some("P1".to_string()),
        status: Some(status.to_string()),
        progress_percent: None,
        notes: None,
    }
}

pub fn task_update(task_id: &str, status: &str) -> EventPayload {
    EventPayload::TaskUpdate(task_fields(task_id, status))
}

/// Scripted ingest endpoint. Every submission is recorded; ids listed in
/// `failing` are rejected, everything else is acknowledged with `ack`.
pub struct StubGateway {
    ack: IngestAck,
    delay: Option<Duration>,
    failing: Mutex<HashSet<i64>>,
    submissions: Mutex<Vec<IngestSubmission>>,
}

impl StubGateway {
    pub fn acknowledging(ack: IngestAck) -> Arc<Self> {
        Arc::new(Self {
            ack,
            delay: None,
            failing: Mutex::new(HashSet::new()),
            submissions: Mutex::new(Vec::new()),
        })
    }

    /// Like `receiving`, but every submission takes `delay` to answer.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            ack: IngestAck::received(),
            delay: Some(delay),
            failing: Mutex::new(HashSet::new()),
            submissions: Mutex::new(Vec::new()),
        })
    }

    pub fn applying() -> Arc<Self> {
        Self::acknowledging(IngestAck::applied())
    }

    pub fn receiving() -> Arc<Self> {
        Self::acknowledging(IngestAck::received())
    }

    pub async fn fail_on(&self, local_id: i64) {
        self.failing.lock().await.insert(local_id);
    }

    pub async fn heal(&self) {
        self.failing.lock().await.clear();
    }

    pub async fn submitted_ids(&self) -> Vec<i64> {
        self.submissions
            .lock()
            .await
            .iter()
            .map(|submission| submission.local_id)
            .collect()
    }

    pub async fn submissions(&self) -> Vec<IngestSubmission> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl IngestGateway for StubGateway {
    async fn submit(&self, submission: &IngestSubmission) -> Result<IngestAck, SubmissionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.submissions.lock().await.push(submission.clone());
        if self.failing.lock().await.contains(&submission.local_id) {
            return Err(SubmissionError::Transport("connection reset".to_string()));
        }
        Ok(self.ack)
    }
}
