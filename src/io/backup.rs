use anyhow::{Context, Result, bail};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub const BACKUP_PREFIX: &str = "backup_";

#[derive(Debug, Clone)]
pub struct BackupResult {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Copy `source` recursively into a new `backup_YYYYMMDD_HHMMSS` directory under `base`.
pub fn backup(source: &Path, base: &Path) -> Result<BackupResult> {
    if !source.is_dir() {
        bail!("Backup source is not a directory: {}", source.display());
    }

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let destination = base.join(format!("{}{}", BACKUP_PREFIX, stamp));
    fs::create_dir_all(&destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.context("Failed to read backup source")?;
        let relative = entry.path().strip_prefix(source)?;
        let target = destination.join(relative);

        // A backup base nested inside the source must not copy itself.
        if entry.path().starts_with(&destination) {
            continue;
        }

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }

    let bytes = directory_size(&destination);
    debug!(path = %destination.display(), bytes, "Created backup");

    Ok(BackupResult {
        path: destination,
        bytes,
    })
}

/// Total size in bytes of the regular files under `path`. A missing path is 0.
pub fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
