//! DNE Server Library
//!
//! HTTP control panel for DNE synchronization runs.
//!
//! # Overview
//!
//! The server exposes a thin surface over the sync pipeline in
//! `dne-ingest`:
//!
//! - **Run trigger**: `POST /run` hands a request to the single-slot
//!   [`executor::RunExecutor`]; at most one run executes at a time and a
//!   conflicting request is answered with 409
//! - **Status**: `GET /status` reads the [`state::RunTracker`] state
//!   machine (running flag, last run timestamp, last result, last error)
//! - **Logs**: `GET /logs` tails the rotating log file
//! - **Health**: `GET /health` probes database connectivity
//!
//! # Framework Stack
//!
//! - **Axum**: web framework
//! - **SQLx**: Postgres pool and migrations
//! - **Tower**: tracing, CORS and compression layers

pub mod config;
pub mod error;
pub mod executor;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export commonly used types
pub use error::AppError;
pub use executor::{RunExecutor, StartOutcome};
pub use state::{RunResult, RunTracker, StatusSnapshot};
