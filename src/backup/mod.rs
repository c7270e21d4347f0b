//! File-copy database snapshot/restore.
//!
//! Backups are plain copies of the SQLite file into a configured directory.
//! Restore copies a snapshot back over the live database; concurrent
//! requests during a restore see last-write-wins semantics, which is an
//! accepted limitation of this tool.

use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::BackupInfo;

#[derive(Clone)]
pub struct BackupService {
    backup_dir: PathBuf,
    db_path: PathBuf,
}

impl BackupService {
    pub fn new(config: &Config) -> Self {
        Self {
            backup_dir: config.storage.backup_path.clone(),
            db_path: config.database.file_path(),
        }
    }

    pub fn with_paths(backup_dir: PathBuf, db_path: PathBuf) -> Self {
        Self {
            backup_dir,
            db_path,
        }
    }

    async fn ensure_backup_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        Ok(())
    }

    /// List snapshots, newest first. Only `.db`/`.sqlite` files count.
    pub async fn list(&self) -> Result<Vec<BackupInfo>, AppError> {
        self.ensure_backup_dir().await?;

        let mut backups = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.backup_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".db") && !name.ends_with(".sqlite") {
                continue;
            }

            match entry.metadata().await {
                Ok(metadata) => backups.push(BackupInfo {
                    name,
                    created_at: file_timestamp(&metadata),
                    size: metadata.len(),
                }),
                Err(e) => {
                    warn!("Failed to stat backup file '{}': {}", name, e);
                }
            }
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Copy the live database into a new timestamped snapshot.
    pub async fn create(&self) -> Result<BackupInfo, AppError> {
        self.ensure_backup_dir().await?;

        if !self.db_path.exists() {
            return Err(AppError::not_found(
                "database file",
                self.db_path.display(),
            ));
        }

        let name = backup_filename(Utc::now());
        let backup_path = self.backup_dir.join(&name);
        tokio::fs::copy(&self.db_path, &backup_path).await?;

        let metadata = tokio::fs::metadata(&backup_path).await?;
        info!("Created backup '{}' ({} bytes)", name, metadata.len());

        Ok(BackupInfo {
            name,
            created_at: file_timestamp(&metadata),
            size: metadata.len(),
        })
    }

    /// Copy a snapshot back over the live database file.
    ///
    /// Open pool connections keep serving whatever pages SQLite hands them;
    /// the next connection sees the restored content (last write wins).
    pub async fn restore(&self, filename: &str) -> Result<(), AppError> {
        let backup_path = self.resolve(filename).await?;
        tokio::fs::copy(&backup_path, &self.db_path).await?;
        info!("Restored database from backup '{}'", filename);
        Ok(())
    }

    /// Delete a snapshot.
    pub async fn delete(&self, filename: &str) -> Result<(), AppError> {
        let backup_path = self.resolve(filename).await?;
        tokio::fs::remove_file(&backup_path).await?;
        info!("Deleted backup '{}'", filename);
        Ok(())
    }

    /// Resolve a snapshot filename to a path, enforcing containment inside
    /// the backup directory.
    async fn resolve(&self, filename: &str) -> Result<PathBuf, AppError> {
        self.ensure_backup_dir().await?;

        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return Err(AppError::invalid_path(filename));
        }

        let backup_path = self.backup_dir.join(filename);
        let resolved = backup_path
            .canonicalize()
            .map_err(|_| AppError::not_found("backup", filename))?;
        let resolved_dir = self.backup_dir.canonicalize()?;

        if !resolved.starts_with(&resolved_dir) {
            return Err(AppError::invalid_path(filename));
        }

        Ok(resolved)
    }
}

fn backup_filename(now: DateTime<Utc>) -> String {
    // ISO timestamp with ':' and '.' flattened so it is filesystem safe
    let timestamp = now.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    format!("backup-{}.db", timestamp)
}

fn file_timestamp(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH))
}
