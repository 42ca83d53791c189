use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::DiagnosticsConfig;

pub const DEFAULT_LOG_FILTER: &str = "info,symphcord_core=debug";

/// Keeps the file writer flushing until dropped.
pub struct TelemetryGuard {
    pub session_id: Uuid,
    pub log_file: PathBuf,
    _file_guard: WorkerGuard,
}

pub fn init_tracing(log_dir: impl AsRef<Path>) -> anyhow::Result<TelemetryGuard> {
    init_tracing_from_config(&DiagnosticsConfig {
        logs_dir: log_dir.as_ref().to_path_buf(),
        ..DiagnosticsConfig::default()
    })
}

/// JSON log file per session, plus compact stdout when enabled. `RUST_LOG`
/// overrides the configured filter.
pub fn init_tracing_from_config(config: &DiagnosticsConfig) -> anyhow::Result<TelemetryGuard> {
    let log_dir = config.logs_dir.as_path();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let session_id = Uuid::new_v4();
    let log_name = session_log_name(&config.trace_file_prefix);
    let log_file = log_dir.join(&log_name);
    let (json_writer, writer_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, log_name));

    let stdout_layer = config.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_names(true)
    });
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(json_writer);

    let installed = tracing_subscriber::registry()
        .with(resolve_filter(&config.rust_log_filter))
        .with(stdout_layer)
        .with(json_layer)
        .try_init();
    if let Err(error) = installed {
        warn!(?error, "tracing subscriber already installed; keeping the existing one");
    } else {
        info!(%session_id, log_file = %log_file.display(), "diagnostics ready");
    }

    Ok(TelemetryGuard {
        session_id,
        log_file,
        _file_guard: writer_guard,
    })
}

fn session_log_name(prefix: &str) -> String {
    let prefix = if prefix.trim().is_empty() { "symphcord" } else { prefix.trim() };
    format!("{prefix}-{}.log", Utc::now().format("%Y%m%d-%H%M%S"))
}

fn resolve_filter(configured: &str) -> EnvFilter {
    let fallback = match configured.trim() {
        "" => DEFAULT_LOG_FILTER,
        filter => filter,
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}
