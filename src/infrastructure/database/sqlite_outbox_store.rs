use super::connection_pool::ConnectionPool;
use super::rows::{EVENT_COLUMNS, OutboxEventRow};
use crate::application::ports::outbox_store::{OutboxStore, SchemaReport};
use crate::domain::entities::{NewOutboxEvent, OutboxEvent, StatusCounts, TypeCount};
use crate::domain::value_objects::{EventId, EventType, SyncStatus};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

const SYNC_LEASE: &str = "outbox-sync";

const MARK_FAILED_SQL: &str = r#"
    UPDATE outbox_events
    SET sync_status = 'failed', error_text = ?2,
        updated_at = MAX(?1, updated_at + 1)
    WHERE id = ?3 AND sync_status = 'pending'
"#;

pub struct SqliteOutboxStore {
    pool: ConnectionPool,
}

impl SqliteOutboxStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    async fn fetch_rows(
        &self,
        sql: &str,
        status: Option<SyncStatus>,
        limit: u32,
    ) -> Result<Vec<OutboxEventRow>, AppError> {
        let mut query = sqlx::query_as::<_, OutboxEventRow>(sql);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        let rows = query
            .bind(i64::from(limit))
            .fetch_all(self.pool.get_pool())
            .await?;
        Ok(rows)
    }

    /// Decodes what it can; undecodable rows come back as `(id, reason)`.
    fn decode_rows(rows: Vec<OutboxEventRow>) -> (Vec<OutboxEvent>, Vec<(i64, String)>) {
        let mut events = Vec::with_capacity(rows.len());
        let mut corrupt = Vec::new();
        for row in rows {
            let id = row.id;
            match OutboxEvent::try_from(row) {
                Ok(event) => events.push(event),
                Err(err) => corrupt.push((id, err.to_string())),
            }
        }
        (events, corrupt)
    }

    fn decode_skipping(rows: Vec<OutboxEventRow>) -> Vec<OutboxEvent> {
        let (events, corrupt) = Self::decode_rows(rows);
        for (id, reason) in corrupt {
            warn!(event_id = id, error = %reason, "skipping undecodable outbox row");
        }
        events
    }

    async fn transition_from_pending(
        &self,
        id: EventId,
        sql: &str,
        reason: Option<&str>,
    ) -> Result<bool, AppError> {
        let mut query = sqlx::query(sql).bind(Self::now_millis());
        if let Some(reason) = reason {
            query = query.bind(reason);
        }
        let result = query.bind(id.value()).execute(self.pool.get_pool()).await?;

        let changed = result.rows_affected() == 1;
        if !changed {
            debug!(event_id = %id, "status update skipped, row is not pending");
        }
        Ok(changed)
    }

    async fn quarantine(&self, id: i64, reason: &str) -> Result<(), AppError> {
        warn!(event_id = id, error = %reason, "marking undecodable outbox row failed");
        sqlx::query(MARK_FAILED_SQL)
            .bind(Self::now_millis())
            .bind(reason)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OutboxStore for SqliteOutboxStore {
    async fn initialize(&self) -> Result<SchemaReport, AppError> {
        // An unreachable database is fatal; only the migration step is best-effort.
        sqlx::query("SELECT 1").execute(self.pool.get_pool()).await?;

        let mut report = SchemaReport::default();
        if let Err(err) = self.pool.migrate().await {
            warn!(error = %err, "schema migration failed, continuing with existing schema");
            report.warnings.push(err.to_string());
        }

        report.version = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(self.pool.get_pool())
        .await
        .ok()
        .flatten();

        info!(version = ?report.version, warnings = report.warnings.len(), "outbox schema ready");
        Ok(report)
    }

    async fn append(&self, event: NewOutboxEvent) -> Result<EventId, AppError> {
        let payload = serde_json::to_string(event.payload.as_json())?;
        let file_refs: Vec<&str> = event.file_refs.iter().map(|f| f.as_str()).collect();
        let file_refs = serde_json::to_string(&file_refs)?;
        let now = Self::now_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO outbox_events (
                event_type, org_id, user_id, entity_ref, payload,
                file_refs, sync_status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(event.org_id.as_str())
        .bind(event.user_id.as_str())
        .bind(event.entity_ref.as_ref().map(|r| r.as_str()))
        .bind(&payload)
        .bind(&file_refs)
        .bind(now)
        .execute(self.pool.get_pool())
        .await?;

        let id = EventId::new(result.last_insert_rowid()).map_err(AppError::Storage)?;
        debug!(event_id = %id, event_type = %event.event_type, "event appended");
        Ok(id)
    }

    async fn get(&self, id: EventId) -> Result<Option<OutboxEvent>, AppError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM outbox_events WHERE id = ?1");
        let row = sqlx::query_as::<_, OutboxEventRow>(&sql)
            .bind(id.value())
            .fetch_optional(self.pool.get_pool())
            .await?;

        row.map(OutboxEvent::try_from).transpose()
    }

    async fn try_acquire_sync_lease(&self, holder: &str, ttl: Duration) -> Result<bool, AppError> {
        let now = Self::now_millis();
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let result = sqlx::query(
            r#"
            INSERT INTO sync_lease (name, holder, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE
            SET holder = excluded.holder, expires_at = excluded.expires_at
            WHERE sync_lease.holder = excluded.holder OR sync_lease.expires_at <= ?4
            "#,
        )
        .bind(SYNC_LEASE)
        .bind(holder)
        .bind(now.saturating_add(ttl_millis))
        .bind(now)
        .execute(self.pool.get_pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_sync_lease(&self, holder: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sync_lease WHERE name = ?1 AND holder = ?2")
            .bind(SYNC_LEASE)
            .bind(holder)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<OutboxEvent>, AppError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM outbox_events \
             WHERE sync_status = ?1 ORDER BY created_at ASC, id ASC LIMIT ?2"
        );
        let rows = self
            .fetch_rows(&sql, Some(SyncStatus::Pending), limit)
            .await?;

        let (events, corrupt) = Self::decode_rows(rows);
        for (id, reason) in corrupt {
            self.quarantine(id, &reason).await?;
        }
        Ok(events)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<OutboxEvent>, AppError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM outbox_events \
             ORDER BY created_at DESC, id DESC LIMIT ?1"
        );
        let rows = self.fetch_rows(&sql, None, limit).await?;
        Ok(Self::decode_skipping(rows))
    }

    async fn list_by_status(
        &self,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<OutboxEvent>, AppError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM outbox_events \
             WHERE sync_status = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let rows = self.fetch_rows(&sql, Some(status), limit).await?;
        Ok(Self::decode_skipping(rows))
    }

    async fn list_recent_of_types(
        &self,
        types: &[EventType],
        limit: u32,
    ) -> Result<Vec<OutboxEvent>, AppError> {
        if types.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; types.len()].join(", ");
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM outbox_events \
             WHERE event_type IN ({placeholders}) \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        );

        let mut query = sqlx::query_as::<_, OutboxEventRow>(&sql);
        for event_type in types {
            query = query.bind(event_type.as_str());
        }
        let rows = query
            .bind(i64::from(limit))
            .fetch_all(self.pool.get_pool())
            .await?;

        let mut events = Self::decode_skipping(rows);
        events.reverse();
        Ok(events)
    }

    async fn mark_synced(&self, id: EventId) -> Result<bool, AppError> {
        self.transition_from_pending(
            id,
            r#"
            UPDATE outbox_events
            SET sync_status = 'synced', server_stage = 'received', error_text = NULL,
                updated_at = MAX(?1, updated_at + 1)
            WHERE id = ?2 AND sync_status = 'pending'
            "#,
            None,
        )
        .await
    }

    async fn mark_applied(&self, id: EventId) -> Result<bool, AppError> {
        self.transition_from_pending(
            id,
            r#"
            UPDATE outbox_events
            SET sync_status = 'synced', server_stage = 'applied', error_text = NULL,
                updated_at = MAX(?1, updated_at + 1)
            WHERE id = ?2 AND sync_status = 'pending'
            "#,
            None,
        )
        .await
    }

    async fn mark_failed(&self, id: EventId, reason: &str) -> Result<bool, AppError> {
        self.transition_from_pending(id, MARK_FAILED_SQL, Some(reason))
            .await
    }

    async fn reset_failed_to_pending(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET sync_status = 'pending', error_text = NULL,
                updated_at = MAX(?1, updated_at + 1)
            WHERE sync_status = 'failed'
            "#,
        )
        .bind(Self::now_millis())
        .execute(self.pool.get_pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn purge_synced(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM outbox_events WHERE sync_status = 'synced'")
            .execute(self.pool.get_pool())
            .await?;

        info!(purged = result.rows_affected(), "synced events purged");
        Ok(result.rows_affected())
    }

    async fn counts_by_status(&self) -> Result<StatusCounts, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT sync_status, COUNT(*) FROM outbox_events GROUP BY sync_status",
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let count = count.max(0) as u64;
            match status.parse::<SyncStatus>() {
                Ok(SyncStatus::Pending) => counts.pending = count,
                Ok(SyncStatus::Synced) => counts.synced = count,
                Ok(SyncStatus::Failed) => counts.failed = count,
                Err(err) => warn!(status = %status, error = %err, "ignoring rows with unknown status"),
            }
        }
        Ok(counts)
    }

    async fn counts_by_type(&self) -> Result<Vec<TypeCount>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT event_type, COUNT(*) AS count
            FROM outbox_events
            GROUP BY event_type
            ORDER BY count DESC, event_type ASC
            "#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(event_type, count)| TypeCount {
                event_type: EventType::from(event_type),
                count: count.max(0) as u64,
            })
            .collect())
    }
}
