//! One end-to-end synchronization run
//!
//! Fetch, decode, serialize, stage, reconcile, strictly in sequence,
//! with no step retried. Extraction storage is scoped to the run and
//! released on every exit path; with `keep_temp` its contents are first
//! moved to a fixed retained location for diagnostics.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::fetch;
use crate::reader::SnapshotReader;
use crate::store::SyncStore;

/// Directory (under the working directory) where `keep_temp` runs park
/// their files.
const RETAINED_DIR: &str = "dne_tmp";

/// Audit counters of one successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    /// Records decoded out of the snapshot files
    pub records_decoded: u64,
    /// Rows bulk-loaded into the staging table
    pub rows_staged: u64,
    /// New ceps inserted into the target
    pub inserted: u64,
    /// Stale ceps removed from the target
    pub deleted: u64,
}

/// Execute one synchronization run against the given store.
pub async fn run<S: SyncStore>(config: &SyncConfig, store: &S) -> Result<SyncOutcome> {
    let work_dir = tempfile::tempdir()?;

    let result = run_in(config, store, work_dir.path()).await;

    if config.keep_temp {
        match retain_temp_files(work_dir.path()) {
            Ok(kept) => info!(path = %kept.display(), "Temporary files retained"),
            Err(err) => warn!(error = ?err, "Failed to retain temporary files"),
        }
    }

    // work_dir is removed here on every path, success or failure.
    result
}

async fn run_in<S: SyncStore>(
    config: &SyncConfig,
    store: &S,
    work_dir: &Path,
) -> Result<SyncOutcome> {
    let files = fetch::download_snapshot(&config.snapshot_url, work_dir).await?;

    let mut reader = SnapshotReader::new(files);
    let mut batch = String::new();
    for record in &mut reader {
        batch.push_str(&record?.to_tsv_row());
    }
    let records_decoded = reader.decoded_count();
    info!(records = records_decoded, "Snapshot decoded");

    let rows_staged = store.stage(&batch).await?;
    let counts = store.reconcile().await?;

    Ok(SyncOutcome {
        records_decoded,
        rows_staged,
        inserted: counts.inserted,
        deleted: counts.deleted,
    })
}

/// Move the run's scratch files into `./dne_tmp` before the scoped
/// directory is deleted.
fn retain_temp_files(work_dir: &Path) -> io::Result<PathBuf> {
    let retained = std::env::current_dir()?.join(RETAINED_DIR);
    fs::create_dir_all(&retained)?;

    for entry in fs::read_dir(work_dir)? {
        let entry = entry?;
        let dest = retained.join(entry.file_name());
        // Rename fails across filesystems; fall back to copying.
        if fs::rename(entry.path(), &dest).is_err() {
            fs::copy(entry.path(), &dest)?;
            fs::remove_file(entry.path())?;
        }
    }

    Ok(retained)
}
