//! File command handlers

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use booklist_core::Store;

use super::{resolve_book_id, resolve_hash_name};
use crate::editor::confirm;
use crate::output::Output;

/// Attach a file to a book
pub fn add(
    store: &Store,
    book_id: &str,
    path: &Path,
    name: Option<String>,
    output: &Output,
) -> Result<()> {
    let book_id = resolve_book_id(store, book_id)?;

    let content = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let name = name
        .or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "file".to_string());

    let hash_name = store
        .add_file(&book_id, &name, &content)
        .context("Failed to attach file")?;

    output.success(&format!("Attached file: {}", hash_name));
    if let Some(entry) = store.get_file(&book_id, &hash_name) {
        output.print_file(&entry, store.file_path(&book_id, &hash_name).as_deref());
    }

    Ok(())
}

/// List a book's files
pub fn list(store: &Store, book_id: &str, output: &Output) -> Result<()> {
    let book_id = resolve_book_id(store, book_id)?;
    let files = store.list_files(&book_id)?;
    output.print_files(&files);
    Ok(())
}

/// Show one file
pub fn show(store: &Store, book_id: &str, hash_name: &str, output: &Output) -> Result<()> {
    let book_id = resolve_book_id(store, book_id)?;
    let hash_name = resolve_hash_name(store, &book_id, hash_name)?;

    let entry = store
        .get_file(&book_id, &hash_name)
        .ok_or_else(|| anyhow::anyhow!("File not found: {}", hash_name))?;

    output.print_file(&entry, store.file_path(&book_id, &hash_name).as_deref());
    Ok(())
}

/// Change a file's display name
pub fn rename(
    store: &Store,
    book_id: &str,
    hash_name: &str,
    new_name: &str,
    output: &Output,
) -> Result<()> {
    let book_id = resolve_book_id(store, book_id)?;
    let hash_name = resolve_hash_name(store, &book_id, hash_name)?;

    store
        .rename_file(&book_id, &hash_name, new_name)
        .context("Failed to rename file")?;

    let name = store
        .get_file(&book_id, &hash_name)
        .map(|entry| entry.record.name)
        .unwrap_or_default();
    output.success(&format!("Renamed {} to {}", hash_name, name));

    Ok(())
}

/// Delete a file
pub fn delete(store: &Store, book_id: &str, hash_name: &str, output: &Output) -> Result<()> {
    let book_id = resolve_book_id(store, book_id)?;
    let hash_name = resolve_hash_name(store, &book_id, hash_name)?;

    if output.should_prompt() {
        if let Some(entry) = store.get_file(&book_id, &hash_name) {
            println!("Delete file: {} ({})", entry.record.name, hash_name);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete_file(&book_id, &hash_name)
        .context("Failed to delete file")?;

    output.success(&format!("Deleted file: {}", hash_name));

    Ok(())
}
