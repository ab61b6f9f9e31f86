//! DNE Ingest Library
//!
//! Synchronizes a Postgres address table with the Correios DNE bulk
//! snapshot.
//!
//! # Pipeline
//!
//! 1. **fetch**: download the snapshot zip and extract the nested
//!    `DNE_GU_*.zip` archive's `*_LOGRADOUROS.TXT` files
//! 2. **decoder / reader**: decode the fixed-width Latin-1 lines into
//!    normalized [`record::AddressRecord`]s
//! 3. **store**: bulk-load a staging table, then converge the target
//!    table's cep set to the staging set inside one transaction
//!
//! # Example
//!
//! ```no_run
//! use dne_ingest::{config::SyncConfig, pipeline, store::PgSyncStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::from_env()?;
//!     let pool = sqlx::PgPool::connect(&config.database_url()).await?;
//!     let store = PgSyncStore::new(pool, &config.table)?;
//!     let outcome = pipeline::run(&config, &store).await?;
//!     println!("inserted {}, deleted {}", outcome.inserted, outcome.deleted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod store;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use pipeline::SyncOutcome;
pub use record::AddressRecord;
