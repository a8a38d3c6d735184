use crate::application::ports::outbox_store::OutboxStore;
use crate::domain::entities::{OutboxEvent, StatusCounts, TypeCount};
use crate::domain::value_objects::SyncStatus;
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::info;

/// Read-only views over the outbox, plus the explicit cleanup of delivered rows.
pub struct HistoryService {
    store: Arc<dyn OutboxStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn OutboxStore>) -> Self {
        Self { store }
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<OutboxEvent>, AppError> {
        self.store.list_recent(limit).await
    }

    pub async fn list_by_status(
        &self,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<OutboxEvent>, AppError> {
        self.store.list_by_status(status, limit).await
    }

    pub async fn counts_by_status(&self) -> Result<StatusCounts, AppError> {
        self.store.counts_by_status().await
    }

    pub async fn counts_by_type(&self) -> Result<Vec<TypeCount>, AppError> {
        self.store.counts_by_type().await
    }

    /// Deletes delivered events. Pending and failed events are never touched.
    pub async fn purge_synced(&self, confirmed: bool) -> Result<u64, AppError> {
        if !confirmed {
            return Err(AppError::validation(
                "purging synced events must be confirmed",
            ));
        }
        let removed = self.store.purge_synced().await?;
        info!(count = removed, "purged synced outbox events");
        Ok(removed)
    }
}
