use std::io;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::AppConfig, infrastructure::directories::ResolvedPaths};

const LOG_FILE_PREFIX: &str = "audit.log";

static INIT: OnceCell<()> = OnceCell::new();
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// `RUST_LOG` wins; otherwise the configured level with sqlx held at warn.
fn audit_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{level},sqlx=warn")))
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"))
}

/// Console output goes to stderr; stdout carries command results.
pub fn init_tracing(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    INIT.get_or_try_init::<_, anyhow::Error>(|| {
        let (file_writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(
                &paths.logs_dir,
                LOG_FILE_PREFIX,
            ));
        let _ = FILE_GUARD.set(guard);

        tracing_subscriber::registry()
            .with(audit_filter(&config.logging.level))
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_ansi(false),
            )
            .init();

        tracing::debug!(
            target: "app",
            logs = %paths.logs_dir.display(),
            file = LOG_FILE_PREFIX,
            "tracing initialized"
        );
        Ok(())
    })?;
    Ok(())
}

