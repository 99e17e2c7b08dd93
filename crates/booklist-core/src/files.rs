//! Attachments stored beside each book
//!
//! Files live in the book's directory under a content-addressed name,
//! `<md5 hex>.<fileID>.<ext>`, while the record keeps a sanitized display
//! name. The file ID makes names unique even for identical content. A name
//! without a dot is its own extension, so `README` is stored as
//! `<md5 hex>.<fileID>.README`.

use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use md5::{Digest, Md5};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{FileEntry, FileRecord};
use crate::storage::error::{ensure_dir, remove_file_if_exists};
use crate::storage::StorageError;
use crate::store::Store;

/// Longest display name kept by `sanitize_filename`, in characters
pub const MAX_FILENAME_LEN: usize = 64;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w._]").unwrap());
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Make a filename safe to use in URLs and on disk
///
/// Anything outside word characters, `.` and `_` becomes `_`, runs of `_`
/// collapse to one, and names over `MAX_FILENAME_LEN` are shortened while
/// keeping their extension.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_").into_owned();

    if collapsed.chars().count() <= MAX_FILENAME_LEN {
        return collapsed;
    }

    match collapsed.rsplit_once('.') {
        Some((_, ext)) if ext.chars().count() < MAX_FILENAME_LEN => {
            let keep = MAX_FILENAME_LEN - 1 - ext.chars().count();
            let mut shortened: String = collapsed.chars().take(keep).collect();
            shortened.push('.');
            shortened.push_str(ext);
            shortened
        }
        _ => collapsed.chars().take(MAX_FILENAME_LEN).collect(),
    }
}

/// Text after the last dot of a filename, or the whole name without a dot
pub fn extension(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, ext)| ext)
}

/// Recorded type of an attachment: `.ext` for dotted names, else the name
fn file_type(name: &str) -> String {
    let ext = extension(name);
    if name.contains('.') {
        format!(".{}", ext)
    } else {
        ext.to_string()
    }
}

/// Lowercase hex MD5 of some content
pub fn md5_hex(content: &[u8]) -> String {
    Md5::digest(content)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Storage name for an attachment
fn hash_name(digest: &str, file_id: u64, ext: &str) -> String {
    format!("{}.{}.{}", digest, file_id, ext)
}

impl Store {
    /// Attach a file to a book and return its storage name
    pub fn add_file(&self, book_id: &str, filename: &str, content: &[u8]) -> CatalogResult<String> {
        let name = sanitize_filename(filename);
        let digest = md5_hex(content);
        let file_type = file_type(&name);

        let mut catalog = self.write();
        let book = catalog
            .get_mut(book_id)
            .ok_or_else(|| CatalogError::BookNotFound(book_id.to_string()))?;

        // The counter only advances once the content is on disk
        let file_id = book.files.count() + 1;
        let hash_name = hash_name(&digest, file_id, extension(&name));

        let dir = self.book_dir(book_id);
        ensure_dir(&dir)?;
        let path = dir.join(&hash_name);
        fs::write(&path, content).map_err(|e| StorageError::from_io(e, &path))?;

        let file_id = book.files.next_id();
        book.files.insert(
            file_id,
            FileRecord {
                name,
                hash_name: hash_name.clone(),
                file_type,
                size: content.len() as u64,
            },
        );
        self.mark_dirty();

        debug!("Added file {} to book {}", hash_name, book_id);
        Ok(hash_name)
    }

    /// Look up an attachment by storage name
    pub fn get_file(&self, book_id: &str, hash_name: &str) -> Option<FileEntry> {
        let catalog = self.read();
        let (file_id, record) = catalog.get(book_id)?.files.find_by_hash(hash_name)?;
        Some(FileEntry {
            file_id,
            record: record.clone(),
        })
    }

    /// All attachments of a book in file ID order
    pub fn list_files(&self, book_id: &str) -> CatalogResult<Vec<FileEntry>> {
        self.read()
            .get(book_id)
            .map(|book| book.files.entries())
            .ok_or_else(|| CatalogError::BookNotFound(book_id.to_string()))
    }

    /// Change an attachment's display name
    ///
    /// The original extension is appended when the new name lacks it.
    pub fn rename_file(&self, book_id: &str, hash_name: &str, new_name: &str) -> CatalogResult<()> {
        let mut catalog = self.write();
        let book = catalog
            .get_mut(book_id)
            .ok_or_else(|| CatalogError::BookNotFound(book_id.to_string()))?;
        let file_id = book
            .files
            .find_by_hash(hash_name)
            .map(|(file_id, _)| file_id)
            .ok_or_else(|| file_not_found(book_id, hash_name))?;

        let Some(record) = book.files.get_mut(file_id) else {
            return Err(file_not_found(book_id, hash_name));
        };

        let mut name = new_name.to_string();
        if !name.ends_with(&record.file_type) {
            name.push_str(&record.file_type);
        }
        record.name = sanitize_filename(&name);
        self.mark_dirty();

        debug!("Renamed file {} to {}", hash_name, record.name);
        Ok(())
    }

    /// Remove an attachment from disk and from the book
    pub fn delete_file(&self, book_id: &str, hash_name: &str) -> CatalogResult<()> {
        let mut catalog = self.write();
        let book = catalog
            .get_mut(book_id)
            .ok_or_else(|| CatalogError::BookNotFound(book_id.to_string()))?;
        let file_id = book
            .files
            .find_by_hash(hash_name)
            .map(|(file_id, _)| file_id)
            .ok_or_else(|| file_not_found(book_id, hash_name))?;

        let path = self.book_dir(book_id).join(hash_name);
        if let Err(e) = remove_file_if_exists(&path) {
            if path.exists() {
                return Err(e.into());
            }
            warn!("Removing {:?} reported an error but it is gone: {}", path, e);
        }

        book.files.remove(file_id);
        self.mark_dirty();

        debug!("Deleted file {} from book {}", hash_name, book_id);
        Ok(())
    }

    /// On-disk location of an attachment, if the book has it
    pub fn file_path(&self, book_id: &str, hash_name: &str) -> Option<PathBuf> {
        self.get_file(book_id, hash_name)
            .map(|_| self.book_dir(book_id).join(hash_name))
    }
}

fn file_not_found(book_id: &str, hash_name: &str) -> CatalogError {
    CatalogError::FileNotFound {
        book_id: book_id.to_string(),
        hash_name: hash_name.to_string(),
    }
}
