//! Booklist Core Library
//!
//! This crate provides the storage engine for Booklist, a personal book
//! catalog: book records, full-text relevance search, attached files and
//! cover images.
//!
//! # Architecture
//!
//! - **Snapshot**: the whole catalog lives in memory and is written to a
//!   single `data.json`, with the previous version kept as `data.json.bak`
//! - **Book directories**: covers and attachments live in
//!   `books/<bookID>/` beside the snapshot
//! - **Autosave**: a background task writes the snapshot when it is dirty
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//!
//! // Add a book
//! let id = store.add_book(&BookFields::new().with(BookField::Title, "Dune"))?;
//! store.add_file(&id, "dune.epub", &bytes)?;
//!
//! // Query books
//! let ids = store.search("dune");
//!
//! store.save()?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Books, attachments and the catalog map
//! - `search`: Relevance ranking
//! - `files`: Content-addressed attachments
//! - `covers`: Cover rendering and storage
//! - `autosave`: Background save task
//! - `storage`: Snapshot persistence
//! - `config`: Application configuration

pub mod autosave;
pub mod config;
pub mod covers;
pub mod error;
pub mod files;
pub mod models;
pub mod search;
pub mod storage;
pub mod store;

pub use autosave::{spawn_autosave, AutosaveHandle};
pub use config::Config;
pub use covers::{CoverRenderer, PassthroughRenderer, RenderedCover};
#[cfg(feature = "covers")]
pub use covers::ImageRenderer;
pub use error::{CatalogError, CatalogResult};
pub use files::sanitize_filename;
pub use models::{Book, BookField, BookFields, BookSummary, Catalog, FileEntry, FileRecord};
pub use search::SearchResults;
pub use storage::{LoadSource, StorageError, StorageStats};
pub use store::{Store, StoreStats};
