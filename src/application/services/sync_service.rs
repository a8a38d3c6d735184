use crate::application::ports::ingest_gateway::{IngestGateway, IngestSubmission};
use crate::application::ports::outbox_store::OutboxStore;
use crate::domain::entities::{OutboxEvent, SyncSummary};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(120);
const LEASE_POLL_INTERVAL: Duration = Duration::from_millis(100);

static NEXT_HOLDER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncRunStatus {
    pub is_syncing: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_summary: Option<SyncSummary>,
    pub total_runs: u64,
    pub run_errors: u64,
    pub last_error: Option<String>,
}

/// Delivers pending outbox events to the ingest gateway, oldest first.
///
/// Runs are serialized twice over: a local mutex orders runs inside this
/// process, and a lease row in the store orders runs across processes sharing
/// the database. A run that finds the lease taken waits for it, then sees only
/// what is still pending, so overlapping runs never submit an event twice.
pub struct SyncService {
    store: Arc<dyn OutboxStore>,
    gateway: Arc<dyn IngestGateway>,
    run_lock: Arc<Mutex<()>>,
    status: Arc<RwLock<SyncRunStatus>>,
    batch_size: u32,
    holder: String,
    lease_ttl: Duration,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        gateway: Arc<dyn IngestGateway>,
        batch_size: u32,
    ) -> Self {
        let holder = format!(
            "{}-{}-{}",
            std::process::id(),
            Utc::now().timestamp_millis(),
            NEXT_HOLDER.fetch_add(1, Ordering::Relaxed)
        );
        Self {
            store,
            gateway,
            run_lock: Arc::new(Mutex::new(())),
            status: Arc::new(RwLock::new(SyncRunStatus::default())),
            batch_size: batch_size.max(1),
            holder,
            lease_ttl: DEFAULT_LEASE_TTL,
        }
    }

    /// How long the lease survives without renewal. It is renewed before every
    /// submission, so it must outlast one request.
    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// One run over the configured batch size.
    pub async fn sync_pending(&self) -> Result<SyncSummary, AppError> {
        self.run_once(self.batch_size).await
    }

    /// Submits up to `limit` pending events one at a time. A rejected or
    /// unreachable submission marks that event failed and the run moves on;
    /// only local storage errors abort the run.
    pub async fn run_once(&self, limit: u32) -> Result<SyncSummary, AppError> {
        let _run = self.run_lock.lock().await;
        self.status.write().await.is_syncing = true;

        let result = self.run_leased(limit).await;

        let mut status = self.status.write().await;
        status.is_syncing = false;
        status.total_runs += 1;
        status.last_run_at = Some(Utc::now());
        match &result {
            Ok(summary) => {
                status.last_summary = Some(*summary);
                status.last_error = None;
            }
            Err(err) => {
                status.run_errors += 1;
                status.last_error = Some(err.to_string());
            }
        }
        result
    }

    /// Moves every failed event back to pending for the next run.
    pub async fn retry_failed(&self) -> Result<u64, AppError> {
        let _run = self.run_lock.lock().await;
        self.acquire_lease().await?;
        let reset = self.store.reset_failed_to_pending().await;
        self.release_lease().await;

        let reset = reset?;
        if reset > 0 {
            info!(count = reset, "failed events queued for retry");
        }
        Ok(reset)
    }

    pub async fn status(&self) -> SyncRunStatus {
        self.status.read().await.clone()
    }

    /// Spawns a periodic sync. The first run starts immediately; ticks missed
    /// while a run is still going are skipped rather than queued.
    pub fn schedule(&self, interval: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match service.sync_pending().await {
                    Ok(summary) if !summary.is_empty() => {
                        info!(
                            synced = summary.synced,
                            failed = summary.failed,
                            "scheduled sync finished"
                        );
                    }
                    Ok(_) => {}
                    Err(err) => error!(error = %err, "scheduled sync aborted"),
                }
            }
        })
    }

    async fn run_leased(&self, limit: u32) -> Result<SyncSummary, AppError> {
        self.acquire_lease().await?;
        let result = self.deliver_pending(limit).await;
        self.release_lease().await;
        result
    }

    async fn acquire_lease(&self) -> Result<(), AppError> {
        let mut waiting = false;
        while !self
            .store
            .try_acquire_sync_lease(&self.holder, self.lease_ttl)
            .await?
        {
            if !waiting {
                info!("another sync run holds the outbox lease, waiting");
                waiting = true;
            }
            tokio::time::sleep(LEASE_POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn release_lease(&self) {
        if let Err(err) = self.store.release_sync_lease(&self.holder).await {
            warn!(error = %err, "failed to release sync lease");
        }
    }

    async fn deliver_pending(&self, limit: u32) -> Result<SyncSummary, AppError> {
        let pending = self.store.list_pending(limit).await?;
        if pending.is_empty() {
            debug!("no pending outbox events");
            return Ok(SyncSummary::default());
        }
        info!(count = pending.len(), "sync run started");

        let mut summary = SyncSummary::default();
        for event in &pending {
            if !self
                .store
                .try_acquire_sync_lease(&self.holder, self.lease_ttl)
                .await?
            {
                warn!(event_id = %event.id, "sync lease lost, ending run early");
                break;
            }
            self.deliver(event, &mut summary).await?;
        }

        info!(
            synced = summary.synced,
            applied = summary.applied,
            failed = summary.failed,
            "sync run finished"
        );
        Ok(summary)
    }

    /// Counts an outcome only when this run actually moved the row out of pending.
    async fn deliver(&self, event: &OutboxEvent, summary: &mut SyncSummary) -> Result<(), AppError> {
        let submission = IngestSubmission::from(event);
        match self.gateway.submit(&submission).await {
            Ok(ack) => {
                let applied = ack.is_applied();
                let transitioned = if applied {
                    self.store.mark_applied(event.id).await?
                } else {
                    self.store.mark_synced(event.id).await?
                };
                if !transitioned {
                    warn!(event_id = %event.id, "event left pending state during submission");
                    return Ok(());
                }
                summary.synced += 1;
                if applied {
                    summary.applied += 1;
                }
                debug!(event_id = %event.id, event_type = %event.event_type, "event delivered");
            }
            Err(err) => {
                warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %err,
                    "event submission failed"
                );
                if !self.store.mark_failed(event.id, &err.to_string()).await? {
                    warn!(event_id = %event.id, "event left pending state before it could be marked failed");
                    return Ok(());
                }
                summary.failed += 1;
            }
        }
        Ok(())
    }
}

impl Clone for SyncService {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            run_lock: self.run_lock.clone(),
            status: self.status.clone(),
            batch_size: self.batch_size,
            holder: self.holder.clone(),
            lease_ttl: self.lease_ttl,
        }
    }
}
