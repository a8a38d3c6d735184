use crate::domain::entities::OutboxEvent;
use crate::domain::value_objects::{
    EntityRef, EventId, EventType, FileRef, OrgId, OutboxPayload, ServerStage, SyncStatus, UserId,
};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const EVENT_COLUMNS: &str = "id, event_type, org_id, user_id, entity_ref, payload, \
     file_refs, sync_status, server_stage, error_text, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct OutboxEventRow {
    pub id: i64,
    pub event_type: String,
    pub org_id: String,
    pub user_id: String,
    pub entity_ref: Option<String>,
    pub payload: String,
    pub file_refs: String,
    pub sync_status: String,
    pub server_stage: Option<String>,
    pub error_text: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<OutboxEventRow> for OutboxEvent {
    type Error = AppError;

    fn try_from(row: OutboxEventRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |msg: String| AppError::Storage(format!("corrupt outbox row {id}: {msg}"));

        let file_refs: Vec<String> =
            serde_json::from_str(&row.file_refs).map_err(|e| corrupt(e.to_string()))?;
        let file_refs = file_refs
            .into_iter()
            .map(FileRef::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(corrupt)?;

        Ok(OutboxEvent {
            id: EventId::new(row.id).map_err(corrupt)?,
            event_type: EventType::from(row.event_type),
            org_id: OrgId::new(row.org_id).map_err(corrupt)?,
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            entity_ref: row
                .entity_ref
                .map(EntityRef::new)
                .transpose()
                .map_err(corrupt)?,
            payload: OutboxPayload::from_json_str(&row.payload).map_err(corrupt)?,
            file_refs,
            sync_status: row.sync_status.parse::<SyncStatus>().map_err(corrupt)?,
            server_stage: row
                .server_stage
                .as_deref()
                .map(str::parse::<ServerStage>)
                .transpose()
                .map_err(corrupt)?,
            error_text: row.error_text,
            created_at: millis_to_datetime(row.created_at).map_err(corrupt)?,
            updated_at: millis_to_datetime(row.updated_at).map_err(corrupt)?,
        })
    }
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| format!("invalid timestamp {millis}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> OutboxEventRow {
        OutboxEventRow {
            id: 4,
            event_type: "task-update".into(),
            org_id: "org-1".into(),
            user_id: "user-1".into(),
            entity_ref: Some("T1".into()),
            payload: r#"{"taskId":"T1","status":"done"}"#.into(),
            file_refs: r#"["file://a.jpg"]"#.into(),
            sync_status: "synced".into(),
            server_stage: Some("applied".into()),
            error_text: None,
            created_at: 1_750_000_000_000,
            updated_at: 1_750_000_000_500,
        }
    }

    #[test]
    fn maps_row_to_event() {
        let event = OutboxEvent::try_from(row()).unwrap();
        assert_eq!(event.id.value(), 4);
        assert_eq!(event.event_type, EventType::TaskUpdate);
        assert_eq!(event.sync_status, SyncStatus::Synced);
        assert_eq!(event.server_stage, Some(ServerStage::Applied));
        assert_eq!(event.file_refs[0].as_str(), "file://a.jpg");
        assert_eq!(event.created_at.timestamp_millis(), 1_750_000_000_000);
    }

    #[test]
    fn unknown_status_is_a_storage_error() {
        let mut bad = row();
        bad.sync_status = "in_flight".into();
        let err = OutboxEvent::try_from(bad).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
