//! Command handlers

use anyhow::{bail, Result};

use booklist_core::{CatalogError, StorageError, Store};

pub mod book;
pub mod config;
pub mod cover;
pub mod file;
pub mod status;

/// Recovery suggestion for a storage failure anywhere in an error chain
pub fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<StorageError>() {
            e.recovery_suggestion()
        } else {
            cause
                .downcast_ref::<CatalogError>()
                .and_then(CatalogError::recovery_suggestion)
        }
    })
}

/// Resolve a book ID (full ID or unique prefix)
pub fn resolve_book_id(store: &Store, id: &str) -> Result<String> {
    if store.contains(id) {
        return Ok(id.to_string());
    }

    let matches: Vec<String> = store
        .list_ids()
        .into_iter()
        .filter(|candidate| candidate.starts_with(id))
        .collect();

    match matches.as_slice() {
        [] => bail!("No book found matching: {}", id),
        [only] => Ok(only.clone()),
        _ => {
            eprintln!("Multiple books match '{}':", id);
            for candidate in &matches {
                let title = store
                    .get_summary(candidate)
                    .map(|summary| summary.title)
                    .unwrap_or_default();
                eprintln!("  {} - {}", candidate, title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Resolve a file's storage name (full name or unique prefix) on a book
pub fn resolve_hash_name(store: &Store, book_id: &str, hash_name: &str) -> Result<String> {
    let files = store.list_files(book_id)?;
    if files.iter().any(|entry| entry.record.hash_name == hash_name) {
        return Ok(hash_name.to_string());
    }

    let matches: Vec<_> = files
        .iter()
        .filter(|entry| entry.record.hash_name.starts_with(hash_name))
        .collect();

    match matches.as_slice() {
        [] => bail!("No file on this book matches: {}", hash_name),
        [only] => Ok(only.record.hash_name.clone()),
        _ => {
            eprintln!("Multiple files match '{}':", hash_name);
            for entry in &matches {
                eprintln!("  {} - {}", entry.record.hash_name, entry.record.name);
            }
            bail!("Ambiguous file name. Please provide more characters.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use booklist_core::{BookField, BookFields, Config, PassthroughRenderer};
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> Store {
        Store::open_with_renderer(
            Config::with_data_dir(temp_dir.path()),
            Box::new(PassthroughRenderer),
        )
    }

    fn add(store: &Store, title: &str) -> String {
        store
            .add_book(&BookFields::new().with(BookField::Title, title))
            .unwrap()
    }

    #[test]
    fn test_resolve_full_and_prefix_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let id = add(&store, "Dune");

        assert_eq!(resolve_book_id(&store, &id).unwrap(), id);
        assert_eq!(resolve_book_id(&store, &id[..8]).unwrap(), id);
        assert!(resolve_book_id(&store, "not-an-id").is_err());
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        add(&store, "Dune");
        add(&store, "Emma");

        // The empty prefix matches every book
        assert!(resolve_book_id(&store, "").is_err());
    }

    #[test]
    fn test_resolve_hash_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let id = add(&store, "Dune");
        let first = store.add_file(&id, "a.pdf", b"one").unwrap();
        let second = store.add_file(&id, "b.pdf", b"two").unwrap();

        assert_eq!(resolve_hash_name(&store, &id, &first).unwrap(), first);
        assert_eq!(resolve_hash_name(&store, &id, &second[..6]).unwrap(), second);
        assert!(resolve_hash_name(&store, &id, "zzz").is_err());
        assert!(resolve_hash_name(&store, "missing", &first).is_err());
    }

    #[test]
    fn test_recovery_hint_for_storage_failures() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let store = Store::open_with_renderer(
            Config::with_data_dir(&blocker),
            Box::new(PassthroughRenderer),
        );
        let id = add(&store, "Dune");

        let err = store.save().context("Failed to save catalog").unwrap_err();
        assert!(recovery_hint(&err).is_some());

        let err = store
            .add_file(&id, "a.pdf", b"x")
            .context("Failed to attach file")
            .unwrap_err();
        assert!(recovery_hint(&err).is_some());

        let err = store
            .add_file("missing", "a.pdf", b"x")
            .context("Failed to attach file")
            .unwrap_err();
        assert!(recovery_hint(&err).is_none());
        assert!(recovery_hint(&anyhow::anyhow!("No book found matching: x")).is_none());
    }
}
