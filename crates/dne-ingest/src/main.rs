//! DNE Ingest - one-shot synchronization from the command line

use anyhow::Result;
use clap::Parser;
use dne_common::logging::{init_logging, LogConfig, LogLevel};
use dne_ingest::config::{
    SyncConfig, DEFAULT_DB_HOST, DEFAULT_DB_PORT, DEFAULT_DB_USER, DEFAULT_SNAPSHOT_URL,
    DEFAULT_TABLE,
};
use dne_ingest::{pipeline, store::PgSyncStore};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dne-ingest")]
#[command(author, version, about = "Synchronize a Postgres table with the Correios DNE snapshot")]
struct Cli {
    /// Snapshot archive URL
    #[arg(long, env = "DNE_ZIP_URL", default_value = DEFAULT_SNAPSHOT_URL)]
    snapshot_url: String,

    /// Database host
    #[arg(long, env = "DNE_DB_HOST", default_value = DEFAULT_DB_HOST)]
    db_host: String,

    /// Database port
    #[arg(long, env = "DNE_DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    db_port: u16,

    /// Database user
    #[arg(long, env = "DNE_DB_USER", default_value = DEFAULT_DB_USER)]
    db_user: String,

    /// Database password
    #[arg(long, env = "DNE_DB_PASSWORD", default_value = "")]
    db_password: String,

    /// Database name
    #[arg(long, env = "DNE_DB_NAME")]
    db_name: String,

    /// Target table name
    #[arg(long, env = "DNE_TABLE", default_value = DEFAULT_TABLE)]
    table: String,

    /// Keep temporary files in ./dne_tmp
    #[arg(long, env = "DNE_KEEP_TEMP")]
    keep_temp: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_sync_config(self) -> SyncConfig {
        SyncConfig {
            snapshot_url: self.snapshot_url,
            db_host: self.db_host,
            db_port: self.db_port,
            db_user: self.db_user,
            db_password: self.db_password,
            db_name: self.db_name,
            table: self.table,
            keep_temp: self.keep_temp,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    if log_config.log_file_prefix == LogConfig::default().log_file_prefix {
        log_config.log_file_prefix = "dne-ingest".to_string();
    }

    init_logging(&log_config)?;

    let config = cli.into_sync_config();
    config.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url())
        .await?;

    let store = PgSyncStore::new(pool, &config.table)?;
    let outcome = pipeline::run(&config, &store).await?;

    info!(
        records = outcome.records_decoded,
        staged = outcome.rows_staged,
        inserted = outcome.inserted,
        deleted = outcome.deleted,
        "Synchronization complete"
    );

    Ok(())
}
