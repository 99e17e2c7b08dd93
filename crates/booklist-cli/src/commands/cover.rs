//! Cover command handlers

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use booklist_core::Store;

use super::resolve_book_id;
use crate::output::{Output, OutputFormat};

/// Set a book's cover from an image file
pub fn set(store: &Store, book_id: &str, image: &Path, output: &Output) -> Result<()> {
    let book_id = resolve_book_id(store, book_id)?;

    let bytes = fs::read(image).with_context(|| format!("Failed to read {:?}", image))?;

    store
        .add_cover(&book_id, &bytes)
        .context("Failed to set cover")?;

    output.success(&format!("Cover set ({})", store.cover_renderer()));

    Ok(())
}

/// Show where a book's cover files are
pub fn show(store: &Store, book_id: &str, output: &Output) -> Result<()> {
    let book_id = resolve_book_id(store, book_id)?;

    let cover = store.cover_path(&book_id, false);
    let preview = store.cover_path(&book_id, true);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "id": book_id,
                    "hasCover": store.cover_exists(&book_id),
                    "cover": cover,
                    "preview": preview
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(cover) = cover {
                println!("{}", cover.display());
            }
        }
        OutputFormat::Human => match cover {
            Some(cover) => {
                println!("Cover:   {}", cover.display());
                if let Some(preview) = preview {
                    println!("Preview: {}", preview.display());
                }
            }
            None => println!("No cover."),
        },
    }

    Ok(())
}

/// Remove a book's cover
pub fn delete(store: &Store, book_id: &str, output: &Output) -> Result<()> {
    let book_id = resolve_book_id(store, book_id)?;

    let removed = store
        .delete_cover(&book_id)
        .context("Failed to delete cover")?;

    if removed {
        output.success("Cover removed");
    } else {
        output.message("Cover file could not be removed.");
    }

    Ok(())
}
