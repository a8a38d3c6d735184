use crate::domain::entities::{NewOutboxEvent, OutboxEvent, StatusCounts, TypeCount};
use crate::domain::value_objects::{EventId, EventType, SyncStatus};
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

/// Result of bringing the local schema up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub version: Option<i64>,
    pub warnings: Vec<String>,
}

impl SchemaReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Durable outbox. The only source of truth for recorded actions.
///
/// `mark_*` return `false` when the row was not pending (already delivered,
/// already failed or missing), leaving the row untouched.
///
/// Listings leave out rows that cannot be decoded. `list_pending` also marks
/// such rows failed with the decode error so they stop blocking the queue.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    async fn initialize(&self) -> Result<SchemaReport, AppError>;

    async fn append(&self, event: NewOutboxEvent) -> Result<EventId, AppError>;

    async fn get(&self, id: EventId) -> Result<Option<OutboxEvent>, AppError>;

    /// Takes or renews the single sync lease for `holder`. Returns `false` while
    /// another holder owns an unexpired lease. Shared by every process on the
    /// same database.
    async fn try_acquire_sync_lease(&self, holder: &str, ttl: Duration) -> Result<bool, AppError>;

    /// Gives the lease up if `holder` still owns it.
    async fn release_sync_lease(&self, holder: &str) -> Result<(), AppError>;

    async fn list_pending(&self, limit: u32) -> Result<Vec<OutboxEvent>, AppError>;

    async fn list_recent(&self, limit: u32) -> Result<Vec<OutboxEvent>, AppError>;

    async fn list_by_status(
        &self,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<OutboxEvent>, AppError>;

    /// The newest `limit` events of the given types, returned oldest first.
    async fn list_recent_of_types(
        &self,
        types: &[EventType],
        limit: u32,
    ) -> Result<Vec<OutboxEvent>, AppError>;

    async fn mark_synced(&self, id: EventId) -> Result<bool, AppError>;

    async fn mark_applied(&self, id: EventId) -> Result<bool, AppError>;

    async fn mark_failed(&self, id: EventId, reason: &str) -> Result<bool, AppError>;

    async fn reset_failed_to_pending(&self) -> Result<u64, AppError>;

    async fn purge_synced(&self) -> Result<u64, AppError>;

    async fn counts_by_status(&self) -> Result<StatusCounts, AppError>;

    async fn counts_by_type(&self) -> Result<Vec<TypeCount>, AppError>;
}
