//! Book command handlers

use std::time::Duration;

use anyhow::{bail, Context, Result};

use booklist_core::{Book, BookField, BookFields, Store};

use super::resolve_book_id;
use crate::editor::{confirm, edit_text, is_interactive, prompt_with_default};
use crate::output::{short_id, Output};

/// Add a new book
pub fn add(store: &Store, fields: BookFields, output: &Output) -> Result<()> {
    let id = store.add_book(&fields).context("Failed to add book")?;

    output.success(&format!("Added book: {}", id));
    if let Some(book) = store.get_book(&id) {
        output.print_book(&id, &book);
    }

    Ok(())
}

/// Edit a book, prompting for each field when none were given
pub fn edit(store: &Store, id: &str, fields: BookFields, output: &Output) -> Result<()> {
    let id = resolve_book_id(store, id)?;

    let fields = if fields.is_empty() {
        prompt_for_fields(store, &id)?
    } else {
        fields
    };

    if fields.is_empty() {
        output.message("Nothing changed.");
        return Ok(());
    }

    store
        .edit_book(&id, &fields)
        .context("Failed to update book")?;

    output.success("Book updated");
    if let Some(book) = store.get_book(&id) {
        output.print_book(&id, &book);
    }

    Ok(())
}

fn prompt_for_fields(store: &Store, id: &str) -> Result<BookFields> {
    if !is_interactive() {
        bail!("No fields given. Pass flags such as --title, or run in a terminal to be prompted.");
    }

    let book = store
        .get_book(id)
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", id))?;

    println!("Editing book: {} - {}", short_id(id), book.title);
    println!("Press Enter to keep current value, or type new value.\n");

    let mut fields = BookFields::new();
    for field in BookField::ALL {
        if field == BookField::Description {
            continue;
        }
        if let Some(value) = prompt_with_default(field.key(), book.field(field))? {
            fields.set(field, value);
        }
    }

    if confirm("Edit description in your editor?")? {
        let description = edit_text(&book.description)?;
        if description.trim() != book.description {
            fields.set(BookField::Description, description);
        }
    }

    Ok(fields)
}

/// Show a single book
pub fn show(store: &Store, id: &str, summary: bool, output: &Output) -> Result<()> {
    let id = resolve_book_id(store, id)?;

    if summary {
        let summary = store
            .get_summary(&id)
            .ok_or_else(|| anyhow::anyhow!("Book not found: {}", id))?;
        output.print_summary(&id, &summary);
    } else {
        let book = store
            .get_book(&id)
            .ok_or_else(|| anyhow::anyhow!("Book not found: {}", id))?;
        output.print_book(&id, &book);
    }

    Ok(())
}

/// Delete a book with its cover and files
pub fn delete(store: &Store, id: &str, output: &Output) -> Result<()> {
    let id = resolve_book_id(store, id)?;

    let book = store
        .get_book(&id)
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", id))?;

    if output.should_prompt() {
        println!("Delete book: {} - {}", short_id(&id), book.title);
        if !book.files.is_empty() {
            println!("This also deletes {} attached file(s).", book.files.len());
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_book(&id).context("Failed to delete book")?;

    output.success(&format!("Deleted book: {}", id));

    Ok(())
}

/// List all books, newest first
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let books = load_books(store, store.list_ids());
    output.print_books(&books);
    Ok(())
}

/// Search books; an empty query lists everything
pub fn search(store: &Store, query: &str, output: &Output) -> Result<()> {
    let (ids, elapsed) = matching_ids(store, query);
    let books = load_books(store, ids);
    output.print_search_results(&books, elapsed);
    Ok(())
}

/// Search result IDs, or every ID newest first for an empty query
fn matching_ids(store: &Store, query: &str) -> (Vec<String>, Duration) {
    if query.is_empty() {
        return (store.list_ids(), Duration::ZERO);
    }
    let results = store.search_timed(query);
    (results.ids, results.elapsed)
}

/// Fetch books by ID, skipping any deleted in the meantime
fn load_books(store: &Store, ids: Vec<String>) -> Vec<(String, Book)> {
    ids.into_iter()
        .filter_map(|id| store.get_book(&id).map(|book| (id, book)))
        .collect()
}
