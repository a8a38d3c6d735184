use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Ingest endpoint; `None` keeps the outbox local-only.
    pub endpoint_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    pub auto_sync: bool,
    pub sync_interval: u64,
    pub batch_size: u32,
    pub request_timeout: u64,
    /// Seconds a sync run may hold the outbox lease without renewing it.
    pub lease_ttl: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    pub window: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://data/outbox.db?mode=rwc".to_string(),
                max_connections: 5,
            },
            sync: SyncConfig {
                endpoint_url: None,
                auth_token: None,
                auto_sync: true,
                sync_interval: 300, // 5 minutes
                batch_size: 100,
                request_timeout: 30,
                lease_ttl: 120,
            },
            replay: ReplayConfig { window: 500 },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("FIELDOPS_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_u64("FIELDOPS_DB_MAX_CONNECTIONS") {
            cfg.database.max_connections = value.max(1) as u32;
        }

        if let Ok(v) = std::env::var("FIELDOPS_SYNC_ENDPOINT") {
            let trimmed = v.trim();
            cfg.sync.endpoint_url = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Ok(v) = std::env::var("FIELDOPS_SYNC_TOKEN") {
            cfg.sync.auth_token = Some(v).filter(|token| !token.trim().is_empty());
        }
        if let Ok(v) = std::env::var("FIELDOPS_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_u64("FIELDOPS_SYNC_INTERVAL_SECS") {
            cfg.sync.sync_interval = value.max(1);
        }
        if let Some(value) = env_u64("FIELDOPS_SYNC_BATCH_SIZE") {
            cfg.sync.batch_size = value.max(1) as u32;
        }
        if let Some(value) = env_u64("FIELDOPS_SYNC_TIMEOUT_SECS") {
            cfg.sync.request_timeout = value.max(1);
        }
        if let Some(value) = env_u64("FIELDOPS_SYNC_LEASE_SECS") {
            cfg.sync.lease_ttl = value.max(1);
        }

        if let Some(value) = env_u64("FIELDOPS_REPLAY_WINDOW") {
            cfg.replay.window = value.max(1) as u32;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.batch_size == 0 {
            return Err("Sync batch_size must be greater than 0".to_string());
        }
        if self.sync.auto_sync && self.sync.sync_interval == 0 {
            return Err("Sync sync_interval must be greater than 0".to_string());
        }
        if self.sync.request_timeout == 0 {
            return Err("Sync request_timeout must be greater than 0".to_string());
        }
        if self.sync.lease_ttl <= self.sync.request_timeout {
            return Err("Sync lease_ttl must be longer than request_timeout".to_string());
        }
        if let Some(url) = &self.sync.endpoint_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("Sync endpoint_url must be an http(s) URL: {url}"));
            }
        }
        if self.replay.window == 0 {
            return Err("Replay window must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| parse_u64(&v))
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
