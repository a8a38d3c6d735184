use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use fieldops_outbox::domain::entities::ActorContext;
use fieldops_outbox::domain::value_objects::{OrgId, SyncStatus};
use fieldops_outbox::{AppConfig, AppState};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(name = "fieldops-outbox")]
#[command(about = "Offline outbox for field operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database URL (overrides FIELDOPS_DATABASE_URL)
    #[arg(long, env = "FIELDOPS_DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the local outbox schema
    Init,
    /// Record an action: {"eventType": "...", "payload": {...}}
    Enqueue {
        #[arg(long)]
        org: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: String,
    },
    /// Deliver pending events once
    Sync {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Deliver pending events periodically until interrupted
    Daemon,
    /// Show event counts by status and type
    Status,
    /// List recent events, optionally filtered by status
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        status: Option<String>,
    },
    /// Move failed events back to pending
    RetryFailed,
    /// Delete delivered events
    PurgeSynced {
        #[arg(long)]
        yes: bool,
    },
    /// Show workers currently clocked in
    Roster {
        #[arg(long)]
        org: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.json_logs)?;

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url.filter(|url| !url.trim().is_empty()) {
        config.database.url = url;
    }

    let state = AppState::new(config)
        .await
        .context("failed to open outbox")?;
    let outcome = run(&state, cli.command).await;
    state.shutdown().await;
    outcome
}

async fn run(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            print_json(&serde_json::json!({
                "schemaVersion": state.schema.version,
                "warnings": state.schema.warnings,
            }))?;
        }
        Commands::Enqueue { org, user, json } => {
            let actor = ActorContext::new(&org, &user)?;
            let (event_type, document) = split_tagged(&json)?;
            let id = state
                .enqueue_service
                .enqueue_document(&actor, &event_type, document)
                .await?;
            print_json(&serde_json::json!({ "id": id }))?;
        }
        Commands::Sync { limit } => {
            let sync = state.sync()?;
            let summary = match limit {
                Some(limit) => sync.run_once(limit).await?,
                None => sync.sync_pending().await?,
            };
            print_json(&summary)?;
        }
        Commands::Daemon => {
            let Some(handle) = state.start_background_sync() else {
                bail!("daemon needs FIELDOPS_SYNC_ENDPOINT set and FIELDOPS_AUTO_SYNC enabled");
            };
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            info!("shutdown signal received");
            handle.abort();
        }
        Commands::Status => {
            print_json(&status_report(state).await?)?;
        }
        Commands::History { limit, status } => {
            let events = match status {
                Some(raw) => {
                    let status: SyncStatus = raw.parse().map_err(|err: String| anyhow!(err))?;
                    state.history_service.list_by_status(status, limit).await?
                }
                None => state.history_service.list_recent(limit).await?,
            };
            print_json(&events)?;
        }
        Commands::RetryFailed => {
            let reset = state.sync()?.retry_failed().await?;
            print_json(&serde_json::json!({ "reset": reset }))?;
        }
        Commands::PurgeSynced { yes } => {
            let removed = state.history_service.purge_synced(yes).await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Roster { org } => {
            let scope = org
                .map(OrgId::new)
                .transpose()
                .map_err(|err| anyhow!(err))?;
            let roster = state.roster_service.currently_in(scope.as_ref()).await?;
            print_json(&roster)?;
        }
    }
    Ok(())
}

/// Counts read from the database, so every process reports the same numbers.
async fn status_report(state: &AppState) -> Result<Value> {
    let counts = state.history_service.counts_by_status().await?;
    let by_type = state.history_service.counts_by_type().await?;
    Ok(serde_json::json!({
        "counts": counts,
        "byType": by_type,
    }))
}

fn split_tagged(raw: &str) -> Result<(String, Value)> {
    let mut value: Value = serde_json::from_str(raw).context("--json is not valid JSON")?;
    let event_type = value
        .get("eventType")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("--json must carry an eventType"))?;
    let payload = value
        .get_mut("payload")
        .map(Value::take)
        .ok_or_else(|| anyhow!("--json must carry a payload object"))?;
    Ok((event_type, payload))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = if json {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
