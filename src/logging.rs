//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console and, optionally, to a
//! JSON log file, plus helpers that give task transitions a uniform shape.

use chrono::Utc;
use std::fs;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::models::short_id;
use crate::state_machine::TaskStatus;

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging for the environment the configuration was
/// resolved for. Safe to call more than once; only the first call installs a
/// subscriber.
pub fn init_structured_logging(config: &LoggingConfig, environment: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = environment.to_lowercase();
        let log_level = get_log_level(&environment);

        let console = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .json()
                .with_filter(env_filter(&log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(true)
                .with_filter(env_filter(&log_level))
                .boxed()
        };

        let mut guard = None;
        let file_layer = config.log_directory.as_ref().and_then(|dir| {
            if let Err(e) = fs::create_dir_all(dir) {
                eprintln!("Failed to create log directory {}: {e}", dir.display());
                return None;
            }
            let file_name = format!(
                "{}.{}.{}.log",
                environment,
                process::id(),
                Utc::now().format("%Y%m%d_%H%M%S")
            );
            let (writer, file_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            guard = Some(file_guard);
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(env_filter(&log_level)),
            )
        });

        // An already-installed global subscriber is not an error
        if tracing_subscriber::registry()
            .with(console)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            log_level = %log_level,
            "Structured logging initialized"
        );

        guard
    });
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn get_log_level(environment: &str) -> String {
    match environment.to_lowercase().as_str() {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log a status transition with the fields every transition carries
pub fn log_status_transition(
    task_id: &Uuid,
    status: TaskStatus,
    actor: &str,
    retry_count: u32,
    error: Option<&str>,
) {
    match (status, error) {
        (TaskStatus::Failed, _) => tracing::error!(
            task_id = %short_id(task_id),
            status = %status,
            actor = %actor,
            retry_count = retry_count,
            error = error,
            "Task status updated"
        ),
        (_, Some(error)) => tracing::warn!(
            task_id = %short_id(task_id),
            status = %status,
            actor = %actor,
            retry_count = retry_count,
            error = %error,
            "Task status updated"
        ),
        (_, None) => tracing::info!(
            task_id = %short_id(task_id),
            status = %status,
            actor = %actor,
            retry_count = retry_count,
            "Task status updated"
        ),
    }
}
