use super::event_payload::EventPayload;
use crate::domain::value_objects::{
    EntityRef, EventId, EventType, FileRef, OrgId, OutboxPayload, ServerStage, SyncStatus, UserId,
};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is recording an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub org_id: OrgId,
    pub user_id: UserId,
}

impl ActorContext {
    pub fn new(org_id: &str, user_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            org_id: OrgId::new(org_id.to_string()).map_err(AppError::Validation)?,
            user_id: UserId::new(user_id.to_string()).map_err(AppError::Validation)?,
        })
    }
}

/// A validated event ready to be appended. Status and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxEvent {
    pub event_type: EventType,
    pub org_id: OrgId,
    pub user_id: UserId,
    pub entity_ref: Option<EntityRef>,
    pub payload: OutboxPayload,
    pub file_refs: Vec<FileRef>,
}

impl NewOutboxEvent {
    pub fn from_payload(actor: &ActorContext, payload: EventPayload) -> Result<Self, AppError> {
        payload.validate()?;
        let entity_ref = payload.entity_ref();
        let file_refs = payload.file_refs();
        let (event_type, document) = payload.into_document()?;

        Ok(Self {
            event_type,
            org_id: actor.org_id.clone(),
            user_id: actor.user_id.clone(),
            entity_ref,
            payload: document,
            file_refs,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboxEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub org_id: OrgId,
    pub user_id: UserId,
    pub entity_ref: Option<EntityRef>,
    pub payload: OutboxPayload,
    pub file_refs: Vec<FileRef>,
    pub sync_status: SyncStatus,
    pub server_stage: Option<ServerStage>,
    pub error_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub fn typed_payload(&self) -> Result<EventPayload, AppError> {
        EventPayload::from_document(&self.event_type, self.payload.as_json())
    }

    pub fn is_pending(&self) -> bool {
        self.sync_status == SyncStatus::Pending
    }
}
