//! Unified storage interface
//!
//! The `Store` owns the in-memory catalog and coordinates between:
//! - the snapshot on disk (`SnapshotPersistence`)
//! - per-book directories holding covers and attachments
//!
//! ## Concurrency
//!
//! `Store` is a cheap handle around shared state, so request handlers and
//! the autosave task can each hold a clone. Every mutation takes the catalog
//! write lock for its whole in-memory change and sets the dirty flag before
//! releasing it. Reads (`get_book`, `search`, ...) take the read lock.
//! `save()` copies the catalog under the read lock and writes it outside.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open_with_config(config);
//!
//! let id = store.add_book(&BookFields::new().with(BookField::Title, "Dune"))?;
//! let book = store.get_book(&id);
//!
//! store.save()?;
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::covers::{renderer_for, CoverRenderer};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Book, BookField, BookFields, BookSummary, Catalog};
use crate::storage::error::remove_dir_if_exists;
use crate::storage::{LoadSource, SnapshotPersistence, StorageResult, StorageStats};

/// Current Unix time in seconds
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Unified storage interface for Booklist
#[derive(Clone)]
pub struct Store {
    inner: Arc<Shared>,
}

struct Shared {
    config: Config,
    persistence: SnapshotPersistence,
    catalog: RwLock<Catalog>,
    /// Unsaved mutations exist since the last snapshot write
    dirty: AtomicBool,
    /// Serializes snapshot rotation between autosave and explicit saves
    save_lock: Mutex<()>,
    load_source: Mutex<LoadSource>,
    covers: Box<dyn CoverRenderer>,
}

/// Counts and storage figures for a status display
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    pub books: usize,
    pub files: usize,
    pub covers: usize,
    pub dirty: bool,
    pub load_source: LoadSource,
    pub storage: StorageStats,
}

impl Store {
    /// Open the store from the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Ok(Self::open_with_config(config))
    }

    /// Open the store with a specific configuration
    ///
    /// The cover renderer is chosen from the compiled features and
    /// `config.resize_covers`.
    pub fn open_with_config(config: Config) -> Self {
        let renderer = renderer_for(&config);
        Self::open_with_renderer(config, renderer)
    }

    /// Open the store with an explicit cover renderer
    pub fn open_with_renderer(config: Config, covers: Box<dyn CoverRenderer>) -> Self {
        let store = Self {
            inner: Arc::new(Shared {
                persistence: SnapshotPersistence::new(config.clone()),
                config,
                catalog: RwLock::new(Catalog::new()),
                dirty: AtomicBool::new(false),
                save_lock: Mutex::new(()),
                load_source: Mutex::new(LoadSource::Empty),
                covers,
            }),
        };
        store.load();
        store
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Where the catalog was loaded from on the last `load()`
    pub fn load_source(&self) -> LoadSource {
        *self.inner.load_source.lock()
    }

    pub(crate) fn covers(&self) -> &dyn CoverRenderer {
        self.inner.covers.as_ref()
    }

    // ==================== Persistence ====================

    /// Replace the in-memory catalog with the snapshot on disk
    ///
    /// Never fails; see `SnapshotPersistence::load` for the fallback chain.
    pub fn load(&self) -> LoadSource {
        let loaded = self.inner.persistence.load();
        let mut catalog = self.write();
        *catalog = loaded.catalog;
        self.inner.dirty.store(false, Ordering::SeqCst);
        *self.inner.load_source.lock() = loaded.source;
        loaded.source
    }

    /// Write the catalog to disk, rotating the previous snapshot to the backup
    ///
    /// On failure the dirty flag is raised again so a later save retries.
    pub fn save(&self) -> StorageResult<()> {
        let _saving = self.inner.save_lock.lock();

        let snapshot = {
            let catalog = self.read();
            self.inner.dirty.store(false, Ordering::SeqCst);
            catalog.clone()
        };

        match self.inner.persistence.save(&snapshot) {
            Ok(()) => {
                info!("Saved {} book(s)", snapshot.len());
                Ok(())
            }
            Err(e) => {
                self.inner.dirty.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Whether unsaved mutations exist
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Record that the catalog changed
    pub fn mark_dirty(&self) {
        self.inner.dirty.store(true, Ordering::SeqCst);
    }

    /// Record that a book's fields changed: stamps `lastModified` and marks dirty
    pub fn mark_modified(&self, book_id: &str) -> CatalogResult<()> {
        let mut catalog = self.write();
        let book = catalog
            .get_mut(book_id)
            .ok_or_else(|| CatalogError::BookNotFound(book_id.to_string()))?;
        self.touch(book);
        Ok(())
    }

    /// Stamp a book already borrowed under the write lock
    pub(crate) fn touch(&self, book: &mut Book) {
        book.last_modified = now();
        self.mark_dirty();
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.inner.catalog.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.inner.catalog.write()
    }

    // ==================== Book Operations ====================

    /// Add a new book and return its ID
    ///
    /// Rejected with `MissingTitle` when the title is absent or blank.
    pub fn add_book(&self, fields: &BookFields) -> CatalogResult<String> {
        let has_title = fields
            .get(BookField::Title)
            .is_some_and(|title| !title.trim().is_empty());
        if !has_title {
            return Err(CatalogError::MissingTitle);
        }

        let book = Book::from_fields(fields);

        let mut catalog = self.write();
        let book_id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !catalog.contains(&candidate) {
                break candidate;
            }
        };
        debug!("Adding book {} ({})", book_id, book.title);
        catalog.insert(book_id.clone(), book);
        self.mark_dirty();

        Ok(book_id)
    }

    /// Overwrite the supplied fields of a book
    ///
    /// A blank title is ignored; a book's title can't be cleared.
    pub fn edit_book(&self, book_id: &str, fields: &BookFields) -> CatalogResult<()> {
        let mut catalog = self.write();
        let book = catalog
            .get_mut(book_id)
            .ok_or_else(|| CatalogError::BookNotFound(book_id.to_string()))?;

        for field in BookField::ALL {
            let Some(value) = fields.get(field) else {
                continue;
            };
            let cleaned = field.clean(value);
            if field == BookField::Title && cleaned.is_empty() {
                continue;
            }
            *book.field_mut(field) = cleaned;
        }

        self.touch(book);
        debug!("Edited book {}", book_id);
        Ok(())
    }

    /// Get a book by ID
    pub fn get_book(&self, book_id: &str) -> Option<Book> {
        self.read().get(book_id).cloned()
    }

    /// Get the projected view of a book (title, author, hasCover, lastModified)
    pub fn get_summary(&self, book_id: &str) -> Option<BookSummary> {
        self.read().get(book_id).map(Book::summary)
    }

    /// Delete a book together with its cover and attachments
    pub fn delete_book(&self, book_id: &str) -> CatalogResult<()> {
        let mut catalog = self.write();
        if !catalog.contains(book_id) {
            return Err(CatalogError::BookNotFound(book_id.to_string()));
        }

        remove_dir_if_exists(&self.book_dir(book_id))?;
        catalog.remove(book_id);
        self.mark_dirty();

        debug!("Deleted book {}", book_id);
        Ok(())
    }

    /// Check whether a book exists
    pub fn contains(&self, book_id: &str) -> bool {
        self.read().contains(book_id)
    }

    /// Number of books
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All book IDs, most recently added first
    pub fn list_ids(&self) -> Vec<String> {
        self.read().ids_newest_first()
    }

    /// Directory holding a book's cover and attachments
    pub fn book_dir(&self, book_id: &str) -> PathBuf {
        self.inner.config.book_dir(book_id)
    }

    // ==================== Stats ====================

    pub fn stats(&self) -> StoreStats {
        let (books, files, covers) = {
            let catalog = self.read();
            let covers = catalog.iter().filter(|(_, book)| book.has_cover).count();
            (catalog.len(), catalog.file_count(), covers)
        };

        StoreStats {
            books,
            files,
            covers,
            dirty: self.is_dirty(),
            load_source: self.load_source(),
            storage: self.inner.persistence.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covers::PassthroughRenderer;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> Store {
        Store::open_with_renderer(
            Config::with_data_dir(temp_dir.path()),
            Box::new(PassthroughRenderer),
        )
    }

    fn titled(title: &str) -> BookFields {
        BookFields::new().with(BookField::Title, title)
    }

    #[test]
    fn test_open_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        assert!(store.is_empty());
        assert!(!store.is_dirty());
        assert_eq!(store.load_source(), LoadSource::Empty);
    }

    #[test]
    fn test_add_requires_title() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let missing = BookFields::new().with(BookField::Author, "George Orwell");
        assert!(matches!(
            store.add_book(&missing),
            Err(CatalogError::MissingTitle)
        ));
        assert!(matches!(
            store.add_book(&titled("   \t")),
            Err(CatalogError::MissingTitle)
        ));

        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_add_and_get_book() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let fields = titled("  Harry Potter and the Philosophers Stone ")
            .with(BookField::ReleaseDate, "1997-06-26 (UK)");
        let id = store.add_book(&fields).unwrap();

        assert!(Uuid::parse_str(&id).is_ok());
        assert!(store.is_dirty());

        let book = store.get_book(&id).unwrap();
        assert_eq!(book.title, "Harry Potter and the Philosophers Stone");
        assert_eq!(book.release_date, "1997-06-26");
        assert_eq!(book.author, "");
        assert_eq!(book.description, "");
        assert!(!book.has_cover);
        assert_eq!(book.last_modified, 0);
        assert!(book.files.is_empty());
        assert_eq!(book.files.count(), 0);
    }

    #[test]
    fn test_add_generates_unique_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let a = store.add_book(&titled("Same")).unwrap();
        let b = store.add_book(&titled("Same")).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_edit_book() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let id = store.add_book(&titled("Dune")).unwrap();

        let before = now();
        store
            .edit_book(&id, &BookFields::new().with(BookField::Language, "english"))
            .unwrap();

        let book = store.get_book(&id).unwrap();
        assert_eq!(book.language, "english");
        assert_eq!(book.title, "Dune");
        assert!(book.last_modified >= before);
    }

    #[test]
    fn test_edit_cannot_blank_title() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let id = store.add_book(&titled("Dune")).unwrap();

        store.edit_book(&id, &titled(" ")).unwrap();
        assert_eq!(store.get_book(&id).unwrap().title, "Dune");

        store.edit_book(&id, &titled(" Dune Messiah ")).unwrap();
        assert_eq!(store.get_book(&id).unwrap().title, "Dune Messiah");
    }

    #[test]
    fn test_edit_unknown_book() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let err = store.edit_book("nope", &titled("Dune")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_get_summary() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let id = store
            .add_book(&titled("Nineteen Eighty-Four").with(BookField::Author, "George Orwell"))
            .unwrap();

        let summary = store.get_summary(&id).unwrap();
        assert_eq!(summary.title, "Nineteen Eighty-Four");
        assert_eq!(summary.author, "George Orwell");
        assert!(!summary.has_cover);
        assert_eq!(summary.last_modified, 0);

        assert!(store.get_summary("missing").is_none());
    }

    #[test]
    fn test_delete_book_removes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let id = store.add_book(&titled("Dune")).unwrap();

        let dir = store.book_dir(&id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("testFile"), b"").unwrap();

        store.delete_book(&id).unwrap();
        assert!(store.get_book(&id).is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn test_delete_book_without_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let id = store.add_book(&titled("Dune")).unwrap();

        store.delete_book(&id).unwrap();
        assert!(!store.contains(&id));
        assert!(store.delete_book(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_ids_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let first = store.add_book(&titled("First")).unwrap();
        let second = store.add_book(&titled("Second")).unwrap();
        let third = store.add_book(&titled("Third")).unwrap();
        store.delete_book(&second).unwrap();

        assert_eq!(store.list_ids(), vec![third, first]);
    }

    #[test]
    fn test_save_clears_dirty_flag() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        store.add_book(&titled("Dune")).unwrap();
        assert!(store.is_dirty());

        store.save().unwrap();
        assert!(!store.is_dirty());
        assert!(store.config().snapshot_path().exists());
    }

    #[test]
    fn test_failed_save_stays_dirty() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let store = Store::open_with_renderer(
            Config::with_data_dir(&blocker),
            Box::new(PassthroughRenderer),
        );

        store.add_book(&titled("Dune")).unwrap();
        assert!(store.save().is_err());
        assert!(store.is_dirty());
    }

    #[test]
    fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();

        let (id, original) = {
            let store = test_store(&temp_dir);
            let id = store
                .add_book(&titled("Dune").with(BookField::Author, "Frank Herbert"))
                .unwrap();
            store.add_book(&titled("Emma")).unwrap();
            store.save().unwrap();
            let book = store.get_book(&id).unwrap();
            (id, book)
        };

        let store = test_store(&temp_dir);
        assert_eq!(store.load_source(), LoadSource::Primary);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_book(&id).unwrap(), original);
    }

    #[test]
    fn test_reopen_recovers_from_backup() {
        let temp_dir = TempDir::new().unwrap();

        let kept = {
            let store = test_store(&temp_dir);
            let kept = store.add_book(&titled("Kept")).unwrap();
            store.save().unwrap();
            store.add_book(&titled("Lost")).unwrap();
            store.save().unwrap();
            kept
        };

        std::fs::remove_file(Config::with_data_dir(temp_dir.path()).snapshot_path()).unwrap();

        let store = test_store(&temp_dir);
        assert_eq!(store.load_source(), LoadSource::Backup);
        assert_eq!(store.list_ids(), vec![kept]);
    }

    #[test]
    fn test_mark_modified() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let id = store.add_book(&titled("Dune")).unwrap();
        store.save().unwrap();

        store.mark_modified(&id).unwrap();
        assert!(store.is_dirty());
        assert!(store.get_book(&id).unwrap().last_modified > 0);
        assert!(store.mark_modified("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_concurrent_adds() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .add_book(&titled(&format!("Book {}-{}", t, i)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 200);
        store.save().unwrap();
        assert_eq!(test_store(&temp_dir).len(), 200);
    }

    #[test]
    fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.add_book(&titled("Dune")).unwrap();

        let stats = store.stats();
        assert_eq!(stats.books, 1);
        assert_eq!(stats.files, 0);
        assert_eq!(stats.covers, 0);
        assert!(stats.dirty);
        assert!(!stats.storage.snapshot_exists);
    }
}
