use crate::domain::entities::OutboxEvent;
use crate::domain::value_objects::ServerStage;
use crate::shared::error::SubmissionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body of the remote ingest call. The remote side deduplicates on `local_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestSubmission {
    pub local_id: i64,
    pub event_type: String,
    pub org_id: String,
    pub user_id: String,
    pub entity_ref: Option<String>,
    pub payload: Value,
    pub file_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&OutboxEvent> for IngestSubmission {
    fn from(event: &OutboxEvent) -> Self {
        Self {
            local_id: event.id.value(),
            event_type: event.event_type.to_string(),
            org_id: event.org_id.to_string(),
            user_id: event.user_id.to_string(),
            entity_ref: event.entity_ref.as_ref().map(ToString::to_string),
            payload: event.payload.as_json().clone(),
            file_refs: event.file_refs.iter().map(ToString::to_string).collect(),
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestAck {
    pub stage: Option<ServerStage>,
}

impl IngestAck {
    pub fn received() -> Self {
        Self {
            stage: Some(ServerStage::Received),
        }
    }

    pub fn applied() -> Self {
        Self {
            stage: Some(ServerStage::Applied),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.stage == Some(ServerStage::Applied)
    }
}

#[async_trait]
pub trait IngestGateway: Send + Sync {
    async fn submit(&self, submission: &IngestSubmission) -> Result<IngestAck, SubmissionError>;
}
