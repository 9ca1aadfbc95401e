//! Lead capture, lifecycle tracking and agent leaderboards over a
//! spreadsheet-shaped row store.

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod desk;
pub mod engine;
pub mod errors;
pub mod leaderboard;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod store;
pub mod window;

pub use crate::clock::{CalendarZone, Clock, ManualClock, SystemClock};
pub use crate::config::{load_settings, EngineSettings};
pub use crate::desk::LeadDesk;
pub use crate::engine::LeadEngine;
pub use crate::errors::{AppError, AppResult};
pub use crate::lifecycle::{LeadStage, StageCounts, ToggleCommand};
pub use crate::models::{
    Agent, AgentLeaderboardStats, AgentRef, Lead, LeadField, LeaderboardData, MeetingPreference, MeetingRequest,
    MeetingRequestPayload, NewLead, NewLeadPayload, SubmittedLead, TimeWindow, ToggleOutcome,
};
pub use crate::notify::{LogNotifier, NotificationDispatcher, Notifier};
pub use crate::store::{LeadStore, MemoryRowStore, RowStore, SqliteRowStore};

use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

pub const SETTINGS_FILE: &str = "lead-engine.yaml";
pub const DATABASE_FILE: &str = "leads.db";

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Opens the local store under `data_dir` and returns a ready desk. Mail goes
/// through `notifier`, or to the log when none is given.
pub fn bootstrap(data_dir: &Path, notifier: Option<Arc<dyn Notifier>>) -> AppResult<LeadDesk> {
    std::fs::create_dir_all(data_dir)?;
    let settings = load_settings(&data_dir.join(SETTINGS_FILE))?;

    let rows = Arc::new(SqliteRowStore::new(&data_dir.join(DATABASE_FILE))?);
    let engine = Arc::new(LeadEngine::new(rows, Arc::new(SystemClock), settings));
    engine.ensure_headers()?;

    let notifications = if engine.settings().notifications_enabled {
        NotificationDispatcher::new(notifier.unwrap_or_else(|| Arc::new(LogNotifier) as Arc<dyn Notifier>))
    } else {
        NotificationDispatcher::disabled()
    };

    tracing::info!(
        data_dir = %data_dir.display(),
        cache_ttl_seconds = engine.settings().cache_ttl_seconds,
        notifications = notifications.is_enabled(),
        "lead engine ready"
    );
    Ok(LeadDesk::new(engine, notifications))
}

/// Installs the JSON file logger. Call once per process.
pub fn init_tracing(data_dir: &Path) -> AppResult<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "leads.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(error.to_string()))
}

pub fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
