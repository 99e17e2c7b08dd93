//! Book covers
//!
//! Each book may have a `cover.jpg` and a small `coverPreview.jpg` in its
//! directory. Producing them is delegated to a `CoverRenderer` chosen at
//! startup:
//!
//! - `ImageRenderer` (feature `covers`): decodes the upload, bounds the
//!   cover to 1200×1600 and builds a 60×80 preview, both as JPEG
//! - `PassthroughRenderer`: stores the upload as-is and has no preview

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::error::{CatalogError, CatalogResult};
use crate::storage::error::{ensure_dir, remove_file_if_exists};
use crate::storage::StorageError;
use crate::store::Store;

pub const COVER_FILENAME: &str = "cover.jpg";
pub const PREVIEW_FILENAME: &str = "coverPreview.jpg";

pub const COVER_MAX_WIDTH: u32 = 1200;
pub const COVER_MAX_HEIGHT: u32 = 1600;
pub const PREVIEW_WIDTH: u32 = 60;
pub const PREVIEW_HEIGHT: u32 = 80;

/// JPEG quality of the full-size cover
pub const COVER_QUALITY: u8 = 95;
/// JPEG quality of the preview
pub const PREVIEW_QUALITY: u8 = 75;

/// Why an upload could not be turned into a cover
#[derive(Error, Debug)]
pub enum CoverError {
    #[error("image data is empty")]
    Empty,

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not encode image: {0}")]
    Encode(String),
}

impl From<CoverError> for CatalogError {
    fn from(err: CoverError) -> Self {
        CatalogError::InvalidImage(err.to_string())
    }
}

/// Bytes to write for a cover
#[derive(Debug, Clone)]
pub struct RenderedCover {
    pub cover: Vec<u8>,
    /// `None` when the renderer produces no preview
    pub preview: Option<Vec<u8>>,
}

/// Turns uploaded image bytes into the files stored for a cover
pub trait CoverRenderer: Send + Sync {
    /// Short name for logs and status output
    fn name(&self) -> &'static str;

    fn render(&self, image: &[u8]) -> Result<RenderedCover, CoverError>;
}

/// Stores uploads unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl CoverRenderer for PassthroughRenderer {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn render(&self, image: &[u8]) -> Result<RenderedCover, CoverError> {
        if image.is_empty() {
            return Err(CoverError::Empty);
        }
        Ok(RenderedCover {
            cover: image.to_vec(),
            preview: None,
        })
    }
}

#[cfg(feature = "covers")]
pub use self::image_renderer::ImageRenderer;

#[cfg(feature = "covers")]
mod image_renderer {
    use image::codecs::jpeg::JpegEncoder;
    use image::imageops::FilterType;
    use image::{DynamicImage, ExtendedColorType, ImageEncoder};

    use super::*;

    /// Resizes and re-encodes covers as JPEG
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImageRenderer;

    impl CoverRenderer for ImageRenderer {
        fn name(&self) -> &'static str {
            "image"
        }

        fn render(&self, bytes: &[u8]) -> Result<RenderedCover, CoverError> {
            let original =
                image::load_from_memory(bytes).map_err(|e| CoverError::Decode(e.to_string()))?;

            let preview =
                original.resize_exact(PREVIEW_WIDTH, PREVIEW_HEIGHT, FilterType::Lanczos3);

            // Bounded, aspect kept, never enlarged
            let cover = if original.width() > COVER_MAX_WIDTH || original.height() > COVER_MAX_HEIGHT
            {
                original.resize(COVER_MAX_WIDTH, COVER_MAX_HEIGHT, FilterType::Lanczos3)
            } else {
                original
            };

            Ok(RenderedCover {
                cover: encode_jpeg(&cover, COVER_QUALITY)?,
                preview: Some(encode_jpeg(&preview, PREVIEW_QUALITY)?),
            })
        }
    }

    fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CoverError> {
        let rgb = image.to_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| CoverError::Encode(e.to_string()))?;
        Ok(bytes)
    }
}

/// Pick the renderer for this build and configuration
#[cfg(feature = "covers")]
pub fn renderer_for(config: &Config) -> Box<dyn CoverRenderer> {
    if config.resize_covers {
        Box::new(ImageRenderer)
    } else {
        Box::new(PassthroughRenderer)
    }
}

/// Pick the renderer for this build and configuration
#[cfg(not(feature = "covers"))]
pub fn renderer_for(config: &Config) -> Box<dyn CoverRenderer> {
    if config.resize_covers {
        debug!("Built without image support, covers are stored as uploaded");
    }
    Box::new(PassthroughRenderer)
}

fn write_file(path: &Path, bytes: &[u8]) -> CatalogResult<()> {
    fs::write(path, bytes).map_err(|e| StorageError::from_io(e, path).into())
}

impl Store {
    /// Name of the renderer in use
    pub fn cover_renderer(&self) -> &'static str {
        self.covers().name()
    }

    /// Set a book's cover from uploaded image bytes
    ///
    /// Rejected uploads change nothing on disk or in the catalog.
    pub fn add_cover(&self, book_id: &str, image: &[u8]) -> CatalogResult<()> {
        if !self.contains(book_id) {
            return Err(CatalogError::BookNotFound(book_id.to_string()));
        }

        // Decoding and resizing happen outside the lock
        let rendered = self.covers().render(image)?;

        let mut catalog = self.write();
        let book = catalog
            .get_mut(book_id)
            .ok_or_else(|| CatalogError::BookNotFound(book_id.to_string()))?;

        let dir = self.book_dir(book_id);
        ensure_dir(&dir)?;
        write_file(&dir.join(COVER_FILENAME), &rendered.cover)?;
        // cover.jpg is on disk now, so the flag follows even if the preview fails
        book.has_cover = true;
        self.touch(book);

        match &rendered.preview {
            Some(preview) => write_file(&dir.join(PREVIEW_FILENAME), preview)?,
            None => {
                remove_file_if_exists(&dir.join(PREVIEW_FILENAME))?;
            }
        }

        debug!(
            "Stored cover for {} ({} bytes, renderer {})",
            book_id,
            rendered.cover.len(),
            self.covers().name()
        );
        Ok(())
    }

    /// Whether a book has a cover; false for unknown books
    pub fn cover_exists(&self, book_id: &str) -> bool {
        self.read()
            .get(book_id)
            .is_some_and(|book| book.has_cover)
    }

    /// Remove a book's cover and preview
    ///
    /// Returns true when the book no longer has a cover.
    pub fn delete_cover(&self, book_id: &str) -> CatalogResult<bool> {
        let mut catalog = self.write();
        let book = catalog
            .get_mut(book_id)
            .ok_or_else(|| CatalogError::BookNotFound(book_id.to_string()))?;

        let dir = self.book_dir(book_id);
        remove_file_if_exists(&dir.join(COVER_FILENAME))?;
        remove_file_if_exists(&dir.join(PREVIEW_FILENAME))?;

        book.has_cover = dir.join(COVER_FILENAME).exists();
        let removed = !book.has_cover;
        self.touch(book);

        debug!("Deleted cover for {}", book_id);
        Ok(removed)
    }

    /// Path of a book's cover, or of its preview, when the file is present
    pub fn cover_path(&self, book_id: &str, preview: bool) -> Option<PathBuf> {
        if !self.cover_exists(book_id) {
            return None;
        }
        let filename = if preview {
            PREVIEW_FILENAME
        } else {
            COVER_FILENAME
        };
        Some(self.book_dir(book_id).join(filename)).filter(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookField, BookFields};
    use tempfile::TempDir;

    fn store_with_book(temp_dir: &TempDir, renderer: Box<dyn CoverRenderer>) -> (Store, String) {
        let store = Store::open_with_renderer(Config::with_data_dir(temp_dir.path()), renderer);
        let id = store
            .add_book(&BookFields::new().with(BookField::Title, "Dune"))
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_passthrough_stores_upload_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let (store, id) = store_with_book(&temp_dir, Box::new(PassthroughRenderer));

        store.add_cover(&id, b"not really a jpeg").unwrap();

        assert!(store.cover_exists(&id));
        let cover = store.cover_path(&id, false).unwrap();
        assert_eq!(fs::read(cover).unwrap(), b"not really a jpeg");
        assert!(store.cover_path(&id, true).is_none());
        assert!(store.get_book(&id).unwrap().last_modified > 0);
    }

    #[test]
    fn test_passthrough_removes_stale_preview() {
        let temp_dir = TempDir::new().unwrap();
        let (store, id) = store_with_book(&temp_dir, Box::new(PassthroughRenderer));
        let dir = store.book_dir(&id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(PREVIEW_FILENAME), b"old").unwrap();

        store.add_cover(&id, b"new").unwrap();
        assert!(!dir.join(PREVIEW_FILENAME).exists());
    }

    #[test]
    fn test_cover_flag_set_when_preview_step_fails() {
        let temp_dir = TempDir::new().unwrap();
        let (store, id) = store_with_book(&temp_dir, Box::new(PassthroughRenderer));
        // A directory where the preview lives cannot be removed as a file
        let dir = store.book_dir(&id);
        fs::create_dir_all(dir.join(PREVIEW_FILENAME)).unwrap();

        let err = store.add_cover(&id, b"cover").unwrap_err();
        assert!(matches!(err, CatalogError::Storage(_)));

        assert!(dir.join(COVER_FILENAME).exists());
        assert!(store.cover_exists(&id));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_passthrough_rejects_empty_upload() {
        let temp_dir = TempDir::new().unwrap();
        let (store, id) = store_with_book(&temp_dir, Box::new(PassthroughRenderer));

        let err = store.add_cover(&id, b"").unwrap_err();
        assert!(err.is_rejected());
        assert!(!store.cover_exists(&id));
    }

    #[test]
    fn test_cover_for_unknown_book() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_with_book(&temp_dir, Box::new(PassthroughRenderer));

        assert!(store.add_cover("missing", b"x").unwrap_err().is_not_found());
        assert!(!store.cover_exists("missing"));
        assert!(store.delete_cover("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_cover() {
        let temp_dir = TempDir::new().unwrap();
        let (store, id) = store_with_book(&temp_dir, Box::new(PassthroughRenderer));
        store.add_cover(&id, b"cover").unwrap();

        assert!(store.delete_cover(&id).unwrap());
        assert!(!store.cover_exists(&id));
        assert!(!store.book_dir(&id).join(COVER_FILENAME).exists());

        // Deleting again still reports no cover
        assert!(store.delete_cover(&id).unwrap());
    }

    #[test]
    fn test_renderer_selection() {
        let mut config = Config::with_data_dir("/tmp/booklist-test");
        config.resize_covers = false;
        assert_eq!(renderer_for(&config).name(), "passthrough");
    }

    #[cfg(feature = "covers")]
    mod image_tests {
        use super::*;
        use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
        use std::io::Cursor;

        fn png(width: u32, height: u32) -> Vec<u8> {
            let image = RgbImage::from_pixel(width, height, Rgb([180, 40, 40]));
            let mut bytes = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(image)
                .write_to(&mut bytes, ImageFormat::Png)
                .unwrap();
            bytes.into_inner()
        }

        fn decode(path: PathBuf) -> DynamicImage {
            image::load_from_memory(&fs::read(path).unwrap()).unwrap()
        }

        #[test]
        fn test_renderer_selection_with_image_support() {
            let config = Config::with_data_dir("/tmp/booklist-test");
            assert!(config.resize_covers);
            assert_eq!(renderer_for(&config).name(), "image");
        }

        #[test]
        fn test_large_cover_is_bounded() {
            let temp_dir = TempDir::new().unwrap();
            let (store, id) = store_with_book(&temp_dir, Box::new(ImageRenderer));

            store.add_cover(&id, &png(2400, 1600)).unwrap();

            let cover = decode(store.cover_path(&id, false).unwrap());
            assert_eq!((cover.width(), cover.height()), (1200, 800));

            let preview = decode(store.cover_path(&id, true).unwrap());
            assert_eq!((preview.width(), preview.height()), (PREVIEW_WIDTH, PREVIEW_HEIGHT));
        }

        #[test]
        fn test_small_cover_is_not_enlarged() {
            let temp_dir = TempDir::new().unwrap();
            let (store, id) = store_with_book(&temp_dir, Box::new(ImageRenderer));

            store.add_cover(&id, &png(100, 150)).unwrap();

            let cover = decode(store.cover_path(&id, false).unwrap());
            assert_eq!((cover.width(), cover.height()), (100, 150));
            assert!(store.cover_exists(&id));
        }

        #[test]
        fn test_non_image_is_rejected() {
            let temp_dir = TempDir::new().unwrap();
            let (store, id) = store_with_book(&temp_dir, Box::new(ImageRenderer));

            let err = store.add_cover(&id, b"definitely not an image").unwrap_err();
            assert!(matches!(err, CatalogError::InvalidImage(_)));

            let book = store.get_book(&id).unwrap();
            assert!(!book.has_cover);
            assert_eq!(book.last_modified, 0);
            assert!(!store.book_dir(&id).exists());
        }
    }
}
