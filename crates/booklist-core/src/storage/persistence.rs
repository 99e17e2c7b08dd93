//! Snapshot persistence
//!
//! Saves and loads the whole catalog as a single JSON snapshot.
//!
//! Storage location: `~/.local/share/booklist/` (configurable via `Config`)
//!
//! Files:
//! - `data.json` - The current snapshot
//! - `data.json.bak` - The previous snapshot, rotated on every save
//!
//! Loading never fails: a bad snapshot falls back to the backup, and a bad
//! backup falls back to an empty catalog. Saving reports every I/O error.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::error::{ensure_dir, remove_file_if_exists, StorageError, StorageResult};
use crate::config::Config;
use crate::models::Catalog;

/// Where a loaded catalog came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The primary snapshot
    Primary,
    /// The backup, because the primary was missing or unreadable
    Backup,
    /// Neither file could be used
    Empty,
}

/// Result of loading the snapshot
#[derive(Debug)]
pub struct Loaded {
    pub catalog: Catalog,
    pub source: LoadSource,
}

/// Persistence layer for the catalog snapshot
pub struct SnapshotPersistence {
    config: Config,
}

impl SnapshotPersistence {
    /// Create a new persistence handler with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check if a snapshot exists on disk
    pub fn exists(&self) -> bool {
        self.config.snapshot_path().exists()
    }

    /// Load the catalog: primary snapshot, then backup, then empty
    pub fn load(&self) -> Loaded {
        if let Err(e) = ensure_dir(&self.config.data_dir) {
            error!("Could not create data directory: {}", e);
        }

        let primary = self.config.snapshot_path();
        let backup = self.config.backup_path();

        let primary_err = match read_snapshot(&primary) {
            Ok(catalog) => {
                info!("Loaded {} book(s) from {:?}", catalog.len(), primary);
                return Loaded {
                    catalog,
                    source: LoadSource::Primary,
                };
            }
            Err(e) => e,
        };

        if primary.exists() {
            warn!("Snapshot unusable, trying backup: {}", primary_err);
        } else {
            debug!("No snapshot at {:?}, trying backup", primary);
        }

        match read_snapshot(&backup) {
            Ok(catalog) => {
                warn!(
                    "Recovered {} book(s) from backup {:?}",
                    catalog.len(),
                    backup
                );
                Loaded {
                    catalog,
                    source: LoadSource::Backup,
                }
            }
            Err(backup_err) => {
                if primary.exists() || backup.exists() {
                    error!(
                        "Snapshot and backup both unusable, starting with an empty catalog: {}; {}",
                        primary_err, backup_err
                    );
                } else {
                    info!("No snapshot found in {:?}, starting empty", self.config.data_dir);
                }
                Loaded {
                    catalog: Catalog::new(),
                    source: LoadSource::Empty,
                }
            }
        }
    }

    /// Save the catalog, rotating the current snapshot to the backup first
    pub fn save(&self, catalog: &Catalog) -> StorageResult<()> {
        let bytes = encode_snapshot(catalog)?;
        self.save_bytes(&bytes)?;
        debug!("Saved {} book(s)", catalog.len());
        Ok(())
    }

    /// Rotate and write an already encoded snapshot
    pub fn save_bytes(&self, bytes: &[u8]) -> StorageResult<()> {
        let primary = self.config.snapshot_path();
        let backup = self.config.backup_path();

        ensure_dir(&self.config.data_dir)?;

        if primary.exists() {
            remove_file_if_exists(&backup)?;
            fs::rename(&primary, &backup).map_err(|source| StorageError::RotateFailed {
                from: primary.clone(),
                to: backup.clone(),
                source,
            })?;
        }

        atomic_write(&primary, bytes)
    }

    /// Sizes and presence of the snapshot files
    pub fn stats(&self) -> StorageStats {
        let snapshot = fs::metadata(self.config.snapshot_path()).ok();
        let backup = fs::metadata(self.config.backup_path()).ok();

        StorageStats {
            snapshot_exists: snapshot.is_some(),
            backup_exists: backup.is_some(),
            snapshot_size: snapshot.map(|m| m.len()).unwrap_or(0),
            backup_size: backup.map(|m| m.len()).unwrap_or(0),
        }
    }
}

/// Storage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    pub snapshot_exists: bool,
    pub backup_exists: bool,
    pub snapshot_size: u64,
    pub backup_size: u64,
}

impl StorageStats {
    pub fn total_size(&self) -> u64 {
        self.snapshot_size + self.backup_size
    }

    /// Total size formatted for humans (e.g. "12.5 KB")
    pub fn total_size_human(&self) -> String {
        human_size(self.total_size())
    }
}

/// Format a byte count for humans (e.g. "12.5 KB")
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Encode the catalog as pretty JSON with four-space indentation
pub fn encode_snapshot(catalog: &Catalog) -> StorageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    catalog.serialize(&mut serializer)?;
    Ok(bytes)
}

fn read_snapshot(path: &Path) -> StorageResult<Catalog> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound {
            path: path.to_path_buf(),
        },
        _ => StorageError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_json::from_slice(&bytes).map_err(|e| StorageError::InvalidFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    // Same directory as the target, so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
