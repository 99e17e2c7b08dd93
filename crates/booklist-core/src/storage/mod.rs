//! Storage layer
//!
//! Handles snapshot persistence and the filesystem helpers shared by the
//! file and cover stores.
//!
//! ## Layout
//!
//! - `<data_dir>/data.json`: the snapshot, source of truth for records
//! - `<data_dir>/data.json.bak`: the previous snapshot
//! - `<data_dir>/books/<bookID>/`: covers and attachments of one book

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{encode_snapshot, human_size, LoadSource, Loaded, SnapshotPersistence, StorageStats};
