//! Storage backend for staging and reconciliation
//!
//! [`SyncStore`] is the seam between the pipeline and the database: stage a
//! serialized snapshot, then converge the target table to it. The Postgres
//! implementation loads the staging table with `COPY FROM STDIN` (the TSV
//! batch is valid COPY text input) and applies the set difference inside a
//! single transaction, so a failed run leaves the target untouched.
//!
//! Table names are interpolated into the statements and therefore must be
//! bare identifiers validated at construction; they only ever come from
//! configuration, never from request input. All data values travel through
//! COPY.

use async_trait::async_trait;
use sqlx::postgres::PgPoolCopyExt;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{Result, SyncError};

/// Row counts of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncCounts {
    pub inserted: u64,
    pub deleted: u64,
}

/// Storage backend the pipeline synchronizes against.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Prepare the staging relation (idempotent create + truncate) and
    /// bulk-load the TSV batch into it. Returns the number of rows staged.
    async fn stage(&self, batch: &str) -> Result<u64>;

    /// Converge the target key set to the staging key set in one atomic
    /// unit of work: insert keys missing from the target, delete keys
    /// absent from staging. Rows whose key already exists in the target
    /// are left untouched.
    async fn reconcile(&self) -> Result<SyncCounts>;
}

/// Postgres-backed [`SyncStore`].
pub struct PgSyncStore {
    pool: PgPool,
    table: String,
    staging: String,
}

impl PgSyncStore {
    /// Build a store for the given target table. The staging table is
    /// `<table>_stage`. Fails if the name is not a bare SQL identifier.
    pub fn new(pool: PgPool, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            staging: format!("{}_stage", table),
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl SyncStore for PgSyncStore {
    async fn stage(&self, batch: &str) -> Result<u64> {
        // LIKE copies the column layout but not the unique index, so the
        // staging table tolerates duplicate ceps.
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (LIKE {})",
            self.staging, self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!("TRUNCATE TABLE {}", self.staging))
            .execute(&self.pool)
            .await?;

        let mut copy = self
            .pool
            .copy_in_raw(&format!(
                "COPY {} (cep, street, city, region, neighborhood) FROM STDIN",
                self.staging
            ))
            .await?;
        copy.send(batch.as_bytes()).await?;
        let rows = copy.finish().await?;

        debug!(rows, table = %self.staging, "Staging table loaded");
        Ok(rows)
    }

    async fn reconcile(&self) -> Result<SyncCounts> {
        let mut tx = self.pool.begin().await?;

        // Insert step: one row per cep present in staging but not in the
        // target. DISTINCT ON collapses duplicate staged keys; the ORDER BY
        // makes the surviving row deterministic. Keys already in the target
        // are never refreshed.
        let inserted = sqlx::query(&format!(
            "INSERT INTO {target} (cep, street, city, region, neighborhood) \
             SELECT DISTINCT ON (s.cep) s.cep, s.street, s.city, s.region, s.neighborhood \
             FROM {staging} s \
             LEFT JOIN {target} t ON t.cep = s.cep \
             WHERE t.cep IS NULL \
             ORDER BY s.cep, s.street, s.city",
            target = self.table,
            staging = self.staging
        ))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Delete step: every cep no longer present in the snapshot.
        let deleted = sqlx::query(&format!(
            "DELETE FROM {target} t \
             WHERE NOT EXISTS (SELECT 1 FROM {staging} s WHERE s.cep = t.cep)",
            target = self.table,
            staging = self.staging
        ))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        info!(inserted, deleted, table = %self.table, "Reconciliation committed");
        Ok(SyncCounts { inserted, deleted })
    }
}

/// Accept only bare SQL identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(SyncError::Config(format!(
            "invalid table name {:?}: expected a bare SQL identifier",
            name
        )))
    }
}
