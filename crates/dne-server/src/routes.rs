//! Control-panel routes
//!
//! - `GET /`: service index
//! - `POST /run`: request a synchronization run (409 while one is active)
//! - `GET /status`: run status (running flag, last run, last result/error)
//! - `GET /logs?lines=N`: tail of the durable log file
//! - `GET /health`: database connectivity probe

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::error::AppError;
use crate::executor::{RunExecutor, StartOutcome};
use crate::state::StatusSnapshot;

/// Lines returned by `GET /logs` when none are requested.
const DEFAULT_LOG_LINES: usize = 200;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub executor: Arc<RunExecutor>,
    pub log_dir: PathBuf,
    pub log_prefix: String,
}

/// Build the control-panel router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/run", post(start_run))
        .route("/status", get(get_status))
        .route("/logs", get(get_logs))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Service index
///
/// GET /
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "DNE Sync Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": ["/run", "/status", "/logs", "/health"]
    }))
}

/// Request a synchronization run
///
/// POST /run
async fn start_run(State(state): State<AppState>) -> impl IntoResponse {
    match state.executor.try_start() {
        StartOutcome::Started => (StatusCode::OK, Json(json!({ "status": "started" }))),
        StartOutcome::AlreadyRunning => {
            (StatusCode::CONFLICT, Json(json!({ "status": "running" })))
        },
    }
}

/// Current run status
///
/// GET /status
async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.executor.status())
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    lines: Option<usize>,
}

/// Tail of the server log file
///
/// GET /logs?lines=200
async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let lines = query.lines.unwrap_or(DEFAULT_LOG_LINES);
    let tail = tail_log(&state.log_dir, &state.log_prefix, lines)?;
    Ok(Json(json!({ "logs": tail })))
}

/// Health check handler
///
/// GET /health
async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    sqlx::query("SELECT 1").fetch_one(&state.db).await?;
    Ok(Json(json!({
        "status": "healthy",
        "database": "connected"
    })))
}

/// Last `lines` lines of the most recent log file with the given prefix.
///
/// The file layer rotates daily, so the current file is found by
/// modification time rather than by reconstructing its name.
fn tail_log(log_dir: &Path, prefix: &str, lines: usize) -> io::Result<String> {
    let Some(path) = newest_log_file(log_dir, prefix)? else {
        return Ok(String::new());
    };

    let content = fs::read(path)?;
    let text = String::from_utf8_lossy(&content);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].join("\n"))
}

fn newest_log_file(log_dir: &Path, prefix: &str) -> io::Result<Option<PathBuf>> {
    if !log_dir.is_dir() {
        return Ok(None);
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn index_names_the_service_and_endpoints() {
        let Json(body) = root().await;
        assert_eq!(body["name"], "DNE Sync Server");
        assert_eq!(body["status"], "running");
        assert!(body["endpoints"]
            .as_array()
            .unwrap()
            .contains(&json!("/run")));
    }

    #[test]
    fn tail_of_missing_log_dir_is_empty() {
        let tail = tail_log(Path::new("/nonexistent/logs"), "dne-server", 10).unwrap();
        assert_eq!(tail, "");
    }

    #[test]
    fn tail_returns_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dne-server.2026-08-31");
        let mut file = fs::File::create(path).unwrap();
        for i in 1..=10 {
            writeln!(file, "line {}", i).unwrap();
        }

        let tail = tail_log(dir.path(), "dne-server", 3).unwrap();
        assert_eq!(tail, "line 8\nline 9\nline 10");
    }

    #[test]
    fn tail_ignores_files_with_other_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("other.log"), "other\n").unwrap();

        let tail = tail_log(dir.path(), "dne-server", 10).unwrap();
        assert_eq!(tail, "");
    }

    #[test]
    fn tail_shorter_than_requested_returns_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dne-server.2026-08-31"), "only line\n").unwrap();

        let tail = tail_log(dir.path(), "dne-server", 100).unwrap();
        assert_eq!(tail, "only line");
    }
}
