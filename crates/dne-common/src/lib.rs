//! DNE Sync Common Library
//!
//! Shared infrastructure for the DNE sync workspace members.
//!
//! Currently this is the logging layer: every binary (the one-shot ingest
//! CLI and the control-panel server) initializes `tracing` through
//! [`logging::init_logging`] so that log output, format and file rotation
//! behave the same everywhere.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LogOutput};
