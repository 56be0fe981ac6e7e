//! Shared test utilities.
//!
//! [`ContentTree`] writes a content directory into a temp dir; the lookup
//! helpers find entities in a decoded [`Index`] and panic with the available
//! names on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tree = ContentTree::new()
//!     .book("dawn", "title = \"Dawn\"", "[[chapters]]\nfile = \"one.md\"\n")
//!     .chapter("dawn", "one.md", "# One")
//!     .write();
//! let index = decode_index(tree.path()).unwrap();
//!
//! let book = find_book(&index, "dawn");
//! let chapter = find_chapter(book, "one");
//! ```

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::SITE_FILE;
use crate::decode::{BOOK_FILE, BOOKS_DIR, CHAPTERS_DIR, NAV_FILE};
use crate::link::flatten;
use crate::types::{Book, Chapter, Index};

// =========================================================================
// Fixture setup
// =========================================================================

/// Builder for an on-disk content directory.
#[derive(Debug, Clone)]
pub struct ContentTree {
    site: String,
    files: Vec<(PathBuf, Vec<u8>)>,
}

impl ContentTree {
    /// A tree whose site document only sets a title.
    pub fn new() -> Self {
        Self {
            site: "title = \"Test Site\"\n".to_string(),
            files: Vec::new(),
        }
    }

    /// Replace the site document.
    pub fn site(mut self, toml: &str) -> Self {
        self.site = toml.to_string();
        self
    }

    /// Add `books/<dir>/` with its book and navigation documents.
    pub fn book(self, dir: &str, book_toml: &str, nav_toml: &str) -> Self {
        let book_dir = PathBuf::from(BOOKS_DIR).join(dir);
        self.file(book_dir.join(BOOK_FILE), book_toml)
            .file(book_dir.join(NAV_FILE), nav_toml)
    }

    /// Add `books/<book_dir>/chapters/<file>`.
    pub fn chapter(self, book_dir: &str, file: &str, text: &str) -> Self {
        let path = PathBuf::from(BOOKS_DIR)
            .join(book_dir)
            .join(CHAPTERS_DIR)
            .join(file);
        self.file(path, text)
    }

    /// Add `layout/<name>`.
    pub fn layout(self, name: &str, text: &str) -> Self {
        self.file(PathBuf::from("layout").join(name), text)
    }

    /// Add an arbitrary file relative to the content root.
    pub fn file(mut self, rel: impl Into<PathBuf>, bytes: impl AsRef<[u8]>) -> Self {
        self.files.push((rel.into(), bytes.as_ref().to_vec()));
        self
    }

    pub fn write(&self) -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SITE_FILE), &self.site).unwrap();
        for (rel, bytes) in &self.files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, bytes).unwrap();
        }
        tmp
    }
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Index lookups: panic with a clear message on miss
// =========================================================================

/// Find a book by unique ID. Panics if not found.
pub fn find_book<'a>(index: &'a Index, unique_id: &str) -> &'a Book {
    index
        .books
        .iter()
        .find(|b| b.unique_id == unique_id)
        .unwrap_or_else(|| {
            panic!(
                "book '{unique_id}' not found. Available: {:?}",
                book_ids(index)
            )
        })
}

/// Find a chapter anywhere in a book's tree by unique ID. Panics if not found.
pub fn find_chapter<'a>(book: &'a Book, unique_id: &str) -> &'a Chapter {
    flatten(&book.chapters)
        .into_iter()
        .find(|c| c.unique_id == unique_id)
        .unwrap_or_else(|| {
            panic!(
                "chapter '{unique_id}' not found in '{}'. Available: {:?}",
                book.unique_id,
                chapter_ids(book)
            )
        })
}

// =========================================================================
// Bulk extractors
// =========================================================================

pub fn book_ids(index: &Index) -> Vec<&str> {
    index.books.iter().map(|b| b.unique_id.as_str()).collect()
}

/// Chapter IDs in reading order.
pub fn chapter_ids(book: &Book) -> Vec<&str> {
    flatten(&book.chapters)
        .into_iter()
        .map(|c| c.unique_id.as_str())
        .collect()
}
