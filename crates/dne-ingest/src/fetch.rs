//! Snapshot download and archive extraction
//!
//! The Correios publish the DNE "GU" release as a zip that wraps another
//! zip (`DNE_GU_<date>.zip`); the inner archive carries the fixed-width
//! data files. Only the `*_LOGRADOUROS.TXT` members are of interest here.
//!
//! Everything is extracted into the run's scoped working directory; the
//! caller owns that directory's lifetime.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{Result, SyncError};

const NESTED_PREFIX: &str = "DNE_GU_";
const NESTED_SUFFIX: &str = ".zip";
const LOGRADOURO_SUFFIX: &str = "_LOGRADOUROS.TXT";

/// Download the snapshot archive and extract the logradouro files.
///
/// Returns the extracted file paths in archive order. A snapshot without
/// the nested `DNE_GU_*.zip` entry, or without any logradouro file, is
/// malformed and fails the run.
pub async fn download_snapshot(url: &str, work_dir: &Path) -> Result<Vec<PathBuf>> {
    let outer_path = work_dir.join("dne.zip");
    download_file(url, &outer_path).await?;

    let nested_path = extract_nested_archive(&outer_path, work_dir)?;
    let files = extract_logradouro_files(&nested_path, work_dir)?;

    if files.is_empty() {
        return Err(SyncError::Archive(format!(
            "no {} entries in nested archive",
            LOGRADOURO_SUFFIX
        )));
    }

    info!(files = files.len(), "Snapshot archive extracted");
    Ok(files)
}

/// Stream a URL to a file on disk.
async fn download_file(url: &str, output_path: &Path) -> Result<()> {
    info!(url, "Downloading snapshot");

    let response = reqwest::get(url).await?.error_for_status()?;

    let mut file = File::create(output_path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
    }

    debug!(bytes = downloaded, path = %output_path.display(), "Download complete");
    Ok(())
}

/// Locate and extract the single nested `DNE_GU_*.zip` member.
fn extract_nested_archive(outer_path: &Path, work_dir: &Path) -> Result<PathBuf> {
    let mut archive = ZipArchive::new(File::open(outer_path)?)?;

    let nested_name = archive
        .file_names()
        .find(|name| name.starts_with(NESTED_PREFIX) && name.ends_with(NESTED_SUFFIX))
        .map(String::from)
        .ok_or_else(|| {
            SyncError::Archive(format!(
                "no {}*{} entry in snapshot archive",
                NESTED_PREFIX, NESTED_SUFFIX
            ))
        })?;

    debug!(entry = %nested_name, "Extracting nested archive");
    let nested_path = work_dir.join(basename(&nested_name));
    let mut entry = archive.by_name(&nested_name)?;
    let mut output = File::create(&nested_path)?;
    std::io::copy(&mut entry, &mut output)?;

    Ok(nested_path)
}

/// Extract every logradouro data file from the nested archive.
fn extract_logradouro_files(nested_path: &Path, work_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(File::open(nested_path)?)?;
    let mut files = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !entry.name().ends_with(LOGRADOURO_SUFFIX) {
            continue;
        }

        let path = work_dir.join(basename(entry.name()));
        debug!(entry = entry.name(), "Extracting data file");
        let mut output = File::create(&path)?;
        std::io::copy(&mut entry, &mut output)?;
        files.push(path);
    }

    Ok(files)
}

/// Final path component of an archive entry name.
fn basename(entry_name: &str) -> &str {
    entry_name.rsplit('/').next().unwrap_or(entry_name)
}
