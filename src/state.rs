use crate::application::ports::{IngestGateway, OutboxStore, SchemaReport};
use crate::application::services::{EnqueueService, HistoryService, RosterService, SyncService};
use crate::infrastructure::database::{ConnectionPool, SqliteOutboxStore};
use crate::infrastructure::remote::HttpIngestGateway;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Wires the outbox store, the gateway and the services from one configuration.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    pub store: Arc<dyn OutboxStore>,
    pub schema: SchemaReport,
    pub enqueue_service: Arc<EnqueueService>,
    pub history_service: Arc<HistoryService>,
    pub roster_service: Arc<RosterService>,
    /// `None` when no ingest endpoint is configured.
    pub sync_service: Option<Arc<SyncService>>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::Configuration)?;

        let gateway = match &config.sync.endpoint_url {
            Some(endpoint) => {
                let gateway = HttpIngestGateway::new(
                    endpoint.clone(),
                    config.sync.auth_token.clone(),
                    Duration::from_secs(config.sync.request_timeout),
                )?;
                Some(Arc::new(gateway) as Arc<dyn IngestGateway>)
            }
            None => None,
        };

        Self::with_gateway(config, gateway).await
    }

    /// Same as [`AppState::new`] with the gateway supplied by the caller.
    pub async fn with_gateway(
        config: AppConfig,
        gateway: Option<Arc<dyn IngestGateway>>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::Configuration)?;

        let pool = ConnectionPool::new(&config.database.url, config.database.max_connections).await?;
        let store: Arc<dyn OutboxStore> = Arc::new(SqliteOutboxStore::new(pool.clone()));
        let schema = store.initialize().await?;
        if !schema.is_clean() {
            warn!(
                warnings = schema.warnings.len(),
                "outbox schema is not fully up to date"
            );
        }

        let sync_service = gateway.map(|gateway| {
            Arc::new(
                SyncService::new(store.clone(), gateway, config.sync.batch_size)
                    .with_lease_ttl(Duration::from_secs(config.sync.lease_ttl)),
            )
        });
        if sync_service.is_none() {
            info!("no ingest endpoint configured; outbox is local-only");
        }

        Ok(Self {
            enqueue_service: Arc::new(EnqueueService::new(store.clone())),
            history_service: Arc::new(HistoryService::new(store.clone())),
            roster_service: Arc::new(RosterService::new(store.clone(), config.replay.window)),
            sync_service,
            schema,
            store,
            pool,
            config,
        })
    }

    pub fn sync(&self) -> Result<&Arc<SyncService>, AppError> {
        self.sync_service.as_ref().ok_or_else(|| {
            AppError::Configuration(
                "sync requires FIELDOPS_SYNC_ENDPOINT to be set".to_string(),
            )
        })
    }

    /// Starts periodic sync when enabled and an endpoint is configured.
    pub fn start_background_sync(&self) -> Option<JoinHandle<()>> {
        if !self.config.sync.auto_sync {
            return None;
        }
        let service = self.sync_service.as_ref()?;
        let interval = Duration::from_secs(self.config.sync.sync_interval);
        info!(interval_secs = interval.as_secs(), "background sync scheduled");
        Some(service.schedule(interval))
    }

    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}
