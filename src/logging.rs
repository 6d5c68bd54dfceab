//! Tracing configuration and log routing.
//!
//! Events go to stdout through a compact formatter and to a log file. `HUGO_RAG_LOG_FILE` names
//! the file to append to; without it the logger writes `logs/hugo-rag.log`. The file layer uses
//! a non-blocking writer whose guard lives for the whole process.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "HUGO_RAG_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "hugo-rag.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where file logs end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Explicit file requested through the environment.
    File(PathBuf),
    /// Default file inside a directory that may need creating.
    Directory {
        /// Directory holding the log file.
        dir: PathBuf,
        /// File name inside `dir`.
        file_name: String,
    },
}

impl LogTarget {
    /// Resolve the target from an optional `HUGO_RAG_LOG_FILE` value.
    pub fn resolve(explicit: Option<&str>) -> Self {
        match explicit.map(str::trim).filter(|value| !value.is_empty()) {
            Some(path) => Self::File(PathBuf::from(path)),
            None => Self::Directory {
                dir: PathBuf::from(DEFAULT_LOG_DIR),
                file_name: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}

/// Configure tracing subscribers for stdout and file logging.
///
/// `RUST_LOG` controls filtering and defaults to `info`.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let target = LogTarget::resolve(std::env::var(LOG_FILE_ENV).ok().as_deref());
    if let Some(writer) = configure_file_writer(&target) {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Returns `None` when the directory cannot be created or the file cannot be opened.
fn configure_file_writer(target: &LogTarget) -> Option<NonBlocking> {
    match target {
        LogTarget::File(path) => match open_append(path) {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                let _ = LOG_GUARD.set(guard);
                Some(non_blocking)
            }
            Err(err) => {
                eprintln!("Failed to open log file {}: {err}", path.display());
                None
            }
        },
        LogTarget::Directory { dir, file_name } => {
            if let Err(err) = std::fs::create_dir_all(dir) {
                eprintln!("Failed to create logs directory {}: {err}", dir.display());
                return None;
            }
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}
