//! Catalog operation errors
//!
//! Validation and not-found conditions are ordinary values here; callers map
//! them to their own responses (a 404, a CLI message, ...). Only
//! `CatalogError::Storage` reports a real I/O failure.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by book, file and cover operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("A book needs a title")]
    MissingTitle,

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("File {hash_name} not found on book {book_id}")]
    FileNotFound { book_id: String, hash_name: String },

    #[error("Not a usable cover image: {0}")]
    InvalidImage(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CatalogError {
    /// True for unknown book or file IDs
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::BookNotFound(_) | CatalogError::FileNotFound { .. }
        )
    }

    /// True when the caller's input was refused
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            CatalogError::MissingTitle | CatalogError::InvalidImage(_)
        )
    }

    /// What the user can do about a storage failure, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            CatalogError::Storage(e) => e.recovery_suggestion(),
            _ => None,
        }
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
