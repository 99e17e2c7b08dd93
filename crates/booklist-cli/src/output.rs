//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::path::Path;
use std::time::Duration;

use chrono::DateTime;
use serde::Serialize;

use booklist_core::storage::human_size;
use booklist_core::{Book, BookField, BookSummary, FileEntry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// A book together with its ID, for JSON output
#[derive(Serialize)]
struct BookView<'a, T: Serialize> {
    id: &'a str,
    #[serde(flatten)]
    book: &'a T,
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single book with its files
    pub fn print_book(&self, id: &str, book: &Book) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:           {}", id);
                for (field, value) in book.text_fields() {
                    if !value.is_empty() || field == BookField::Title {
                        println!("{:<13} {}", format!("{}:", label(field)), value);
                    }
                }
                println!("Cover:        {}", if book.has_cover { "yes" } else { "no" });
                println!("Modified:     {}", format_timestamp(book.last_modified));

                if !book.files.is_empty() {
                    println!();
                    println!("── Files ({}) ──", book.files.len());
                    for (_, record) in book.files.iter() {
                        println!(
                            "{} | {} | {}",
                            record.hash_name,
                            record.name,
                            human_size(record.size)
                        );
                    }
                }
            }
            OutputFormat::Json => print_json(&BookView { id, book }),
            OutputFormat::Quiet => println!("{}", id),
        }
    }

    /// Print the summary view of a book
    pub fn print_summary(&self, id: &str, summary: &BookSummary) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", id);
                println!("Title:    {}", summary.title);
                if !summary.author.is_empty() {
                    println!("Author:   {}", summary.author);
                }
                println!("Cover:    {}", if summary.has_cover { "yes" } else { "no" });
                println!("Modified: {}", format_timestamp(summary.last_modified));
            }
            OutputFormat::Json => print_json(&BookView { id, book: summary }),
            OutputFormat::Quiet => println!("{}", id),
        }
    }

    /// Print a list of books
    pub fn print_books(&self, books: &[(String, Book)]) {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("No books found.");
                    return;
                }
                for (id, book) in books {
                    let files_indicator = if book.files.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", book.files.len())
                    };
                    println!(
                        "{} | {}{} | {}",
                        short_id(id),
                        truncate(&book.title, 40),
                        files_indicator,
                        truncate(&book.author, 30)
                    );
                }
                println!("\n{} book(s)", books.len());
            }
            OutputFormat::Json => {
                let views: Vec<_> = books
                    .iter()
                    .map(|(id, book)| BookView { id, book })
                    .collect();
                print_json(&views);
            }
            OutputFormat::Quiet => {
                for (id, _) in books {
                    println!("{}", id);
                }
            }
        }
    }

    /// Print search results in relevance order
    pub fn print_search_results(&self, books: &[(String, Book)], elapsed: Duration) {
        match self.format {
            OutputFormat::Json => {
                let views: Vec<_> = books
                    .iter()
                    .map(|(id, book)| BookView { id, book })
                    .collect();
                print_json(&serde_json::json!({
                    "results": views,
                    "elapsed_ms": elapsed.as_secs_f64() * 1000.0
                }));
            }
            _ => {
                self.print_books(books);
                if self.format == OutputFormat::Human && !books.is_empty() {
                    println!("Search took {:.2} ms", elapsed.as_secs_f64() * 1000.0);
                }
            }
        }
    }

    /// Print a single attached file
    pub fn print_file(&self, entry: &FileEntry, path: Option<&Path>) {
        match self.format {
            OutputFormat::Human => {
                println!("File ID:   {}", entry.file_id);
                println!("Name:      {}", entry.record.name);
                println!("Stored as: {}", entry.record.hash_name);
                if !entry.record.file_type.is_empty() {
                    println!("Type:      {}", entry.record.file_type);
                }
                println!("Size:      {}", human_size(entry.record.size));
                if let Some(path) = path {
                    println!("Path:      {}", path.display());
                }
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "file": entry,
                "path": path
            })),
            OutputFormat::Quiet => println!("{}", entry.record.hash_name),
        }
    }

    /// Print a book's attached files
    pub fn print_files(&self, entries: &[FileEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No files attached.");
                    return;
                }
                for entry in entries {
                    println!(
                        "{:>3} | {} | {} | {}",
                        entry.file_id,
                        entry.record.hash_name,
                        truncate(&entry.record.name, 40),
                        human_size(entry.record.size)
                    );
                }
                println!("\n{} file(s)", entries.len());
            }
            OutputFormat::Json => print_json(&entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.record.hash_name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Pretty-print a value as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Could not format output as JSON: {}", e),
    }
}

/// Human label for a book field
fn label(field: BookField) -> &'static str {
    match field {
        BookField::Title => "Title",
        BookField::Author => "Author",
        BookField::Series => "Series",
        BookField::Description => "Description",
        BookField::Isbn => "ISBN",
        BookField::ReleaseDate => "Released",
        BookField::Publisher => "Publisher",
        BookField::Language => "Language",
        BookField::Genre => "Genre",
    }
}

/// First 8 characters of an ID
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}

/// Format a Unix timestamp, "never" for 0
pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp == 0 {
        return "never".to_string();
    }
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Multi-byte characters are not split
        assert_eq!(truncate("ééééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0f8fad5b-d9cb-469f-a165-70867728950e"), "0f8fad5b");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "never");
        assert_eq!(format_timestamp(86_400), "1970-01-02 00:00");
    }

    #[test]
    fn test_book_view_flattens_id() {
        let book = Book {
            title: "Dune".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(BookView {
            id: "abc",
            book: &book,
        })
        .unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["title"], "Dune");
        assert_eq!(json["files"]["count"], 0);
    }
}
