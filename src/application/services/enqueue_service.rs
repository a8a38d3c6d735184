use crate::application::ports::outbox_store::OutboxStore;
use crate::domain::entities::outbox::{
    ActivityLogPayload, AssetRegisterPayload, BiometricEnrollPayload, ClockBatchPayload,
    DocumentAttachPayload, ProjectUpdatePayload, TaskUpdatePayload, VehicleTripPayload,
};
use crate::domain::entities::{ActorContext, EventPayload, NewOutboxEvent};
use crate::domain::value_objects::{EventId, EventType};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Producer-facing entry point. Every action is validated here, before it can
/// reach the outbox; rejected actions leave no trace in storage.
pub struct EnqueueService {
    store: Arc<dyn OutboxStore>,
}

impl EnqueueService {
    pub fn new(store: Arc<dyn OutboxStore>) -> Self {
        Self { store }
    }

    pub async fn enqueue(
        &self,
        actor: &ActorContext,
        payload: EventPayload,
    ) -> Result<EventId, AppError> {
        let event = NewOutboxEvent::from_payload(actor, payload).inspect_err(|err| {
            debug!(error = %err, "action rejected before enqueue");
        })?;
        let event_type = event.event_type.clone();

        let id = self.store.append(event).await?;
        info!(
            event_id = %id,
            event_type = %event_type,
            org_id = %actor.org_id,
            "action recorded"
        );
        Ok(id)
    }

    /// Enqueues a raw JSON document for the given event type, as received from
    /// an untyped producer. Schema mismatches are validation failures.
    pub async fn enqueue_document(
        &self,
        actor: &ActorContext,
        event_type: &str,
        document: Value,
    ) -> Result<EventId, AppError> {
        let payload = EventPayload::from_document(&EventType::from(event_type), &document)
            .map_err(|err| AppError::Validation(format!("invalid {event_type} payload: {err}")))?;
        self.enqueue(actor, payload).await
    }

    pub async fn record_activity(
        &self,
        actor: &ActorContext,
        activity: ActivityLogPayload,
    ) -> Result<EventId, AppError> {
        self.enqueue(actor, EventPayload::ActivityLog(activity)).await
    }

    pub async fn update_project(
        &self,
        actor: &ActorContext,
        update: ProjectUpdatePayload,
    ) -> Result<EventId, AppError> {
        self.enqueue(actor, EventPayload::ProjectUpdate(update)).await
    }

    pub async fn update_task(
        &self,
        actor: &ActorContext,
        update: TaskUpdatePayload,
    ) -> Result<EventId, AppError> {
        self.enqueue(actor, EventPayload::TaskUpdate(update)).await
    }

    pub async fn attach_document(
        &self,
        actor: &ActorContext,
        document: DocumentAttachPayload,
    ) -> Result<EventId, AppError> {
        self.enqueue(actor, EventPayload::DocumentAttach(document)).await
    }

    pub async fn record_clock_batch(
        &self,
        actor: &ActorContext,
        batch: ClockBatchPayload,
    ) -> Result<EventId, AppError> {
        self.enqueue(actor, EventPayload::ClockBatch(batch)).await
    }

    pub async fn log_vehicle_trip(
        &self,
        actor: &ActorContext,
        trip: VehicleTripPayload,
    ) -> Result<EventId, AppError> {
        self.enqueue(actor, EventPayload::VehicleTrip(trip)).await
    }

    pub async fn register_asset(
        &self,
        actor: &ActorContext,
        asset: AssetRegisterPayload,
    ) -> Result<EventId, AppError> {
        self.enqueue(actor, EventPayload::AssetRegister(asset)).await
    }

    pub async fn enroll_biometric(
        &self,
        actor: &ActorContext,
        enrollment: BiometricEnrollPayload,
    ) -> Result<EventId, AppError> {
        self.enqueue(actor, EventPayload::BiometricEnroll(enrollment))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ClockAction, SyncStatus};
    use crate::infrastructure::database::{ConnectionPool, SqliteOutboxStore};
    use serde_json::json;

    async fn setup_service() -> (EnqueueService, Arc<dyn OutboxStore>) {
        let pool = ConnectionPool::from_memory().await.unwrap();
        let store: Arc<dyn OutboxStore> = Arc::new(SqliteOutboxStore::new(pool));
        store.initialize().await.unwrap();
        (EnqueueService::new(store.clone()), store)
    }

    fn actor() -> ActorContext {
        ActorContext::new("org-1", "supervisor-7").unwrap()
    }

    fn manual_batch(note: Option<&str>) -> ClockBatchPayload {
        ClockBatchPayload {
            action: ClockAction::In,
            worker_ids: vec!["w-1".into()],
            group_id: Some("G1".into()),
            project_id: None,
            manual: true,
            note: note.map(str::to_string),
            photo_ref: Some("file://face-w-1.jpg".into()),
            location: None,
        }
    }

    #[tokio::test]
    async fn test_manual_clock_without_note_is_never_queued() {
        let (service, store) = setup_service().await;

        let err = service
            .record_clock_batch(&actor(), manual_batch(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_pending(10).await.unwrap().is_empty());

        service
            .record_clock_batch(&actor(), manual_batch(Some("reader offline")))
            .await
            .unwrap();
        assert_eq!(store.list_pending(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_activity_carries_entity_and_file_refs() {
        let (service, store) = setup_service().await;

        let id = service
            .record_activity(
                &actor(),
                ActivityLogPayload {
                    project_id: "P1".into(),
                    task_id: Some("T9".into()),
                    description: "Poured foundation".into(),
                    hours: Some(6.5),
                    photo_refs: vec!["file://a.jpg".into(), "file://b.jpg".into()],
                    location: None,
                },
            )
            .await
            .unwrap();

        let event = store.get(id).await.unwrap().unwrap();
        assert_eq!(event.event_type, EventType::ActivityLog);
        assert_eq!(event.entity_ref.unwrap().as_str(), "T9");
        let refs: Vec<&str> = event.file_refs.iter().map(|f| f.as_str()).collect();
        assert_eq!(refs, vec!["file://a.jpg", "file://b.jpg"]);
        assert_eq!(event.sync_status, SyncStatus::Pending);
        assert_eq!(event.user_id.as_str(), "supervisor-7");
    }

    #[tokio::test]
    async fn test_enqueue_document_maps_schema_errors_to_validation() {
        let (service, store) = setup_service().await;

        let err = service
            .enqueue_document(&actor(), "vehicle-trip", json!({ "purpose": "delivery" }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .enqueue_document(&actor(), "fuel-log", json!({ "litres": 40 }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let id = service
            .enqueue_document(
                &actor(),
                "vehicle-trip",
                json!({ "registration": "CA 123-456", "odometerStart": 10.0, "odometerEnd": 42.5 }),
            )
            .await
            .unwrap();
        let event = store.get(id).await.unwrap().unwrap();
        assert_eq!(event.entity_ref.unwrap().as_str(), "CA 123-456");
    }

    #[tokio::test]
    async fn test_biometric_enrollment_ships_templates() {
        let (service, store) = setup_service().await;

        let id = service
            .enroll_biometric(
                &actor(),
                BiometricEnrollPayload {
                    worker_id: "w-3".into(),
                    template_refs: vec!["file://tpl-left.bin".into(), "file://tpl-right.bin".into()],
                    consent: true,
                },
            )
            .await
            .unwrap();

        let event = store.get(id).await.unwrap().unwrap();
        assert_eq!(event.file_refs.len(), 2);
        assert!(matches!(
            event.typed_payload().unwrap(),
            EventPayload::BiometricEnroll(_)
        ));
    }
}
