//! Data models for Booklist
//!
//! Defines the core data structures: `Book`, its `FileTable` of attachments,
//! and the `Catalog` that maps book IDs to books.
//!
//! The serde mapping of these types *is* the snapshot format, so field names
//! and field order must stay stable:
//!
//! ```json
//! {
//!     "<bookID>": {
//!         "files": { "count": 1, "1": { "name": "...", "hashName": "...", "type": ".pdf", "size": 3 } },
//!         "hasCover": false,
//!         "lastModified": 0,
//!         "title": "...",
//!         ...
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Unexpected, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The editable text fields of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookField {
    Title,
    Author,
    Series,
    Description,
    Isbn,
    ReleaseDate,
    Publisher,
    Language,
    Genre,
}

impl BookField {
    /// Every field, in snapshot order
    pub const ALL: [BookField; 9] = [
        BookField::Title,
        BookField::Author,
        BookField::Series,
        BookField::Description,
        BookField::Isbn,
        BookField::ReleaseDate,
        BookField::Publisher,
        BookField::Language,
        BookField::Genre,
    ];

    /// Key used for this field in the snapshot
    pub fn key(self) -> &'static str {
        match self {
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Series => "series",
            BookField::Description => "description",
            BookField::Isbn => "isbn",
            BookField::ReleaseDate => "releaseDate",
            BookField::Publisher => "publisher",
            BookField::Language => "language",
            BookField::Genre => "genre",
        }
    }

    /// Maximum stored length in characters
    pub fn max_len(self) -> usize {
        match self {
            BookField::Title => 192,
            BookField::Author => 128,
            BookField::Series => 128,
            BookField::Description => 4096,
            BookField::Isbn => 256,
            BookField::ReleaseDate => 10,
            BookField::Publisher => 128,
            BookField::Language => 64,
            BookField::Genre => 128,
        }
    }

    /// Trim surrounding whitespace and truncate to the field's maximum
    pub fn clean(self, value: &str) -> String {
        value.trim().chars().take(self.max_len()).collect()
    }
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BookField {
    type Err = String;

    /// Accepts the snapshot key (`releaseDate`) or its snake_case form (`release_date`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('_', "").to_lowercase();
        BookField::ALL
            .into_iter()
            .find(|field| field.key().to_lowercase() == normalized)
            .ok_or_else(|| format!("unknown book field: {}", s))
    }
}

/// Field values supplied by a caller when adding or editing a book
///
/// `None` means "not supplied". Values are cleaned by the store, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub series: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub release_date: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub genre: Option<String>,
}

impl BookFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, field: BookField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: BookField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    pub fn get(&self, field: BookField) -> Option<&str> {
        match field {
            BookField::Title => self.title.as_deref(),
            BookField::Author => self.author.as_deref(),
            BookField::Series => self.series.as_deref(),
            BookField::Description => self.description.as_deref(),
            BookField::Isbn => self.isbn.as_deref(),
            BookField::ReleaseDate => self.release_date.as_deref(),
            BookField::Publisher => self.publisher.as_deref(),
            BookField::Language => self.language.as_deref(),
            BookField::Genre => self.genre.as_deref(),
        }
    }

    /// True when no field was supplied
    pub fn is_empty(&self) -> bool {
        BookField::ALL.into_iter().all(|field| self.get(field).is_none())
    }

    fn slot_mut(&mut self, field: BookField) -> &mut Option<String> {
        match field {
            BookField::Title => &mut self.title,
            BookField::Author => &mut self.author,
            BookField::Series => &mut self.series,
            BookField::Description => &mut self.description,
            BookField::Isbn => &mut self.isbn,
            BookField::ReleaseDate => &mut self.release_date,
            BookField::Publisher => &mut self.publisher,
            BookField::Language => &mut self.language,
            BookField::Genre => &mut self.genre,
        }
    }
}

/// Metadata for one attached file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Sanitized display filename
    pub name: String,
    /// Content-addressed storage filename (`md5hex.fileID.ext`)
    #[serde(rename = "hashName")]
    pub hash_name: String,
    /// Extension including the leading dot, empty when the file has none
    #[serde(rename = "type")]
    pub file_type: String,
    /// Size in bytes
    pub size: u64,
}

/// A file record together with its file ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub file_id: u64,
    #[serde(flatten)]
    pub record: FileRecord,
}

/// A book's attachments plus the sequence counter used to number them
///
/// The counter only ever grows, so a file ID is never handed out twice for
/// the same book even after deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTable {
    count: u64,
    entries: BTreeMap<u64, FileRecord>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest file ID handed out so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of files currently attached
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance the counter and return the new file ID
    pub fn next_id(&mut self) -> u64 {
        self.count += 1;
        self.count
    }

    pub fn insert(&mut self, file_id: u64, record: FileRecord) {
        self.count = self.count.max(file_id);
        self.entries.insert(file_id, record);
    }

    pub fn get(&self, file_id: u64) -> Option<&FileRecord> {
        self.entries.get(&file_id)
    }

    pub fn get_mut(&mut self, file_id: u64) -> Option<&mut FileRecord> {
        self.entries.get_mut(&file_id)
    }

    pub fn remove(&mut self, file_id: u64) -> Option<FileRecord> {
        self.entries.remove(&file_id)
    }

    /// Find a file by its storage name (linear scan)
    pub fn find_by_hash(&self, hash_name: &str) -> Option<(u64, &FileRecord)> {
        self.entries
            .iter()
            .find(|(_, record)| record.hash_name == hash_name)
            .map(|(id, record)| (*id, record))
    }

    /// Files in file ID order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &FileRecord)> {
        self.entries.iter().map(|(id, record)| (*id, record))
    }

    /// Owned entries in file ID order
    pub fn entries(&self) -> Vec<FileEntry> {
        self.iter()
            .map(|(file_id, record)| FileEntry {
                file_id,
                record: record.clone(),
            })
            .collect()
    }
}

impl Serialize for FileTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len() + 1))?;
        map.serialize_entry("count", &self.count)?;
        for (id, record) in &self.entries {
            map.serialize_entry(&id.to_string(), record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FileTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FileTableVisitor)
    }
}

struct FileTableVisitor;

impl<'de> Visitor<'de> for FileTableVisitor {
    type Value = FileTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with a \"count\" and numbered file records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FileTable, A::Error> {
        let mut table = FileTable::new();
        let mut count = 0;

        while let Some(key) = access.next_key::<String>()? {
            if key == "count" {
                count = access.next_value()?;
                continue;
            }
            let file_id: u64 = key
                .parse()
                .map_err(|_| de::Error::invalid_value(Unexpected::Str(&key), &"a file ID"))?;
            let record: FileRecord = access.next_value()?;
            table.insert(file_id, record);
        }

        // A hand-edited snapshot must not be able to rewind the counter
        table.count = table.count.max(count);
        Ok(table)
    }
}

/// A catalogued book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    pub files: FileTable,
    /// True iff `cover.jpg` exists for this book
    pub has_cover: bool,
    /// Unix timestamp of the last field edit, 0 if never edited
    pub last_modified: i64,
    pub title: String,
    pub author: String,
    pub series: String,
    pub description: String,
    pub isbn: String,
    pub release_date: String,
    pub publisher: String,
    pub language: String,
    pub genre: String,
}

impl Book {
    /// Build a book from caller-supplied fields
    ///
    /// Supplied fields are cleaned, missing ones are left empty.
    pub fn from_fields(fields: &BookFields) -> Self {
        let mut book = Self::default();
        for field in BookField::ALL {
            if let Some(value) = fields.get(field) {
                *book.field_mut(field) = field.clean(value);
            }
        }
        book
    }

    pub fn field(&self, field: BookField) -> &str {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Series => &self.series,
            BookField::Description => &self.description,
            BookField::Isbn => &self.isbn,
            BookField::ReleaseDate => &self.release_date,
            BookField::Publisher => &self.publisher,
            BookField::Language => &self.language,
            BookField::Genre => &self.genre,
        }
    }

    pub fn field_mut(&mut self, field: BookField) -> &mut String {
        match field {
            BookField::Title => &mut self.title,
            BookField::Author => &mut self.author,
            BookField::Series => &mut self.series,
            BookField::Description => &mut self.description,
            BookField::Isbn => &mut self.isbn,
            BookField::ReleaseDate => &mut self.release_date,
            BookField::Publisher => &mut self.publisher,
            BookField::Language => &mut self.language,
            BookField::Genre => &mut self.genre,
        }
    }

    /// Every text field with its value, in snapshot order
    pub fn text_fields(&self) -> impl Iterator<Item = (BookField, &str)> {
        BookField::ALL
            .into_iter()
            .map(move |field| (field, self.field(field)))
    }

    /// Reduced view used for listings
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            title: self.title.clone(),
            author: self.author.clone(),
            has_cover: self.has_cover,
            last_modified: self.last_modified,
        }
    }
}

/// The projected view of a book: exactly title, author, hasCover, lastModified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub title: String,
    pub author: String,
    pub has_cover: bool,
    pub last_modified: i64,
}

/// All books keyed by book ID, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    books: IndexMap<String, Book>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn contains(&self, book_id: &str) -> bool {
        self.books.contains_key(book_id)
    }

    pub fn get(&self, book_id: &str) -> Option<&Book> {
        self.books.get(book_id)
    }

    pub fn get_mut(&mut self, book_id: &str) -> Option<&mut Book> {
        self.books.get_mut(book_id)
    }

    /// Insert a book, appending it to the insertion order
    pub fn insert(&mut self, book_id: impl Into<String>, book: Book) {
        self.books.insert(book_id.into(), book);
    }

    /// Remove a book, keeping the order of the remaining ones
    pub fn remove(&mut self, book_id: &str) -> Option<Book> {
        self.books.shift_remove(book_id)
    }

    /// Books in insertion order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &Book)> {
        self.books.iter().map(|(id, book)| (id.as_str(), book))
    }

    /// Book IDs, most recently added first
    pub fn ids_newest_first(&self) -> Vec<String> {
        self.books.keys().rev().cloned().collect()
    }

    /// Total number of attachments across all books
    pub fn file_count(&self) -> usize {
        self.books.values().map(|book| book.files.len()).sum()
    }
}
