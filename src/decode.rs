//! Decoder: content directory → unvalidated document graph.
//!
//! Reads one TOML document per entity and projects it onto the entity types.
//! Absent fields take their defaults; keys folio does not know are kept in
//! the entity's parameter bag. Nothing is normalized here beyond defaults:
//! IDs, titles, tags, status and dates are checked by [`crate::validate`].
//!
//! ## Input Layout
//!
//! ```text
//! content/
//! ├── folio.toml                 # Site: title, language_code, url, favicon, [build]
//! ├── layout/                    # Templates + static files (see render)
//! └── books/
//!     ├── dawn/
//!     │   ├── book.toml          # Book metadata
//!     │   ├── nav.toml           # Chapter tree: [[chapters]] with nested [[chapters.chapters]]
//!     │   ├── chapters/
//!     │   │   ├── 01-arrival.md
//!     │   │   └── 02-departure.md
//!     │   └── images/
//!     │       └── cover.webp
//!     └── dusk/
//!         └── ...
//! ```
//!
//! Books are decoded in parallel, one unit per book directory, and sibling
//! chapters of a book in parallel as well. Book directories are visited in
//! lexicographic order and results keep that order.

use crate::config::{BUILD_KEY, SITE_FILE};
use crate::content::Content;
use crate::fanout::join_all;
use crate::naming::is_safe_relative_path;
use crate::params::params_from_table;
use crate::types::{
    Asset, Book, Chapter, ExternalReference, Index, Profile, RawBookFields, RawChapterFields,
    SeriesEntry,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const BOOKS_DIR: &str = "books";
pub const BOOK_FILE: &str = "book.toml";
pub const NAV_FILE: &str = "nav.toml";
pub const CHAPTERS_DIR: &str = "chapters";
pub const IMAGES_DIR: &str = "images";

/// Site language when `folio.toml` declares none.
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{path}: field '{field}' must be a string or a date, got {found}")]
    FieldType {
        path: PathBuf,
        field: String,
        found: &'static str,
    },
    #[error(
        "chapter #{position} in {path}: missing identifier (one of 'unique_id', 'title' or 'file' is required)"
    )]
    MissingChapterIdentifier { path: PathBuf, position: String },
    #[error(
        "chapter #{position} in {path}: file \"{file}\" must be a relative path inside the chapters directory"
    )]
    UnsafeChapterFile {
        path: PathBuf,
        position: String,
        file: String,
    },
    #[error("book '{book}': {source}")]
    Book {
        book: String,
        #[source]
        source: Box<DecodeError>,
    },
}

// =============================================================================
// Documents as written on disk
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SiteDoc {
    title: Option<String>,
    short_description: String,
    about: Content,
    language_code: Option<String>,
    url: String,
    favicon: String,
}

const SITE_KEYS: &[&str] = &[
    "title",
    "short_description",
    "about",
    "language_code",
    "url",
    "favicon",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BookDoc {
    unique_id: Option<String>,
    title: String,
    titles_alternate: Vec<String>,
    subtitle: String,
    short_description: String,
    about: Content,
    url: String,
    language_code: Option<String>,
    authors: Vec<Profile>,
    contributors: Vec<Profile>,
    publishers: Vec<Profile>,
    tags: Vec<String>,
    status: Option<String>,
    series: Vec<SeriesEntry>,
    edition: String,
    date_published_start: Option<toml::Value>,
    date_published_end: Option<toml::Value>,
    links: Vec<ExternalReference>,
    mirrors: Vec<ExternalReference>,
    cover_image: Option<Asset>,
    assets: Vec<Asset>,
    ids: BTreeMap<String, String>,
    copyright: String,
    license: String,
}

const BOOK_KEYS: &[&str] = &[
    "unique_id",
    "title",
    "titles_alternate",
    "subtitle",
    "short_description",
    "about",
    "url",
    "language_code",
    "authors",
    "contributors",
    "publishers",
    "tags",
    "status",
    "series",
    "edition",
    "date_published_start",
    "date_published_end",
    "links",
    "mirrors",
    "cover_image",
    "assets",
    "ids",
    "copyright",
    "license",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NavDoc {
    chapters: Vec<NavEntry>,
}

/// One chapter descriptor in `nav.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NavEntry {
    file: Option<String>,
    title: String,
    unique_id: String,
    subtitle: String,
    short_description: String,
    authors_note: Content,
    language_code: Option<String>,
    authors: Vec<Profile>,
    contributors: Vec<Profile>,
    links: Vec<ExternalReference>,
    date_published: Option<toml::Value>,
    date_modified: Option<toml::Value>,
    chapters: Vec<NavEntry>,
    #[serde(flatten)]
    extra: toml::Table,
}

impl NavEntry {
    fn has_identifier(&self) -> bool {
        let file = self.file.as_deref().unwrap_or_default();
        !(self.unique_id.trim().is_empty() && self.title.trim().is_empty() && file.trim().is_empty())
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the content directory at `root` into an [`Index`].
///
/// `folio.toml` is required. A missing `books/` directory yields a site
/// with no books. Any unreadable or malformed book aborts the decode with
/// the first error in book-directory order.
pub fn decode_index(root: &Path) -> Result<Index, DecodeError> {
    let site_path = root.join(SITE_FILE);
    let mut table = read_table(&site_path)?;
    table.remove(BUILD_KEY);
    let site: SiteDoc = project(take_keys(&mut table, SITE_KEYS), &site_path)?;

    let input_path = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let title = site.title.unwrap_or_else(|| {
        input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let mut index = Index {
        title,
        short_description: site.short_description,
        about: site.about,
        language_code: site
            .language_code
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        url: site.url.trim().to_string(),
        favicon: site.favicon.trim().to_string(),
        params: params_from_table(table),
        input_path,
        ..Default::default()
    };

    let book_dirs = list_book_dirs(&index.input_path.join(BOOKS_DIR))?;
    info!(count = book_dirs.len(), root = %root.display(), "decoding books");

    let language = index.language_code.clone();
    index.books = join_all(&book_dirs, |dir| {
        decode_book(dir, &language).map_err(|e| DecodeError::Book {
            book: dir_name(dir),
            source: Box::new(e),
        })
    })?;

    Ok(index)
}

/// Book directories under `books_dir`, sorted by name. Hidden directories
/// and plain files are skipped.
fn list_book_dirs(books_dir: &Path) -> Result<Vec<PathBuf>, DecodeError> {
    if !books_dir.is_dir() {
        debug!(path = %books_dir.display(), "no books directory");
        return Ok(Vec::new());
    }
    let read_err = |source| DecodeError::Read {
        path: books_dir.to_path_buf(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(books_dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if path.is_dir() && !dir_name(&path).starts_with('.') {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Decode one book directory. `language_code` is the site language, used
/// when the book declares none.
pub fn decode_book(dir: &Path, language_code: &str) -> Result<Book, DecodeError> {
    let book_path = dir.join(BOOK_FILE);
    let mut table = read_table(&book_path)?;
    let doc: BookDoc = project(take_keys(&mut table, BOOK_KEYS), &book_path)?;

    let nav_path = dir.join(NAV_FILE);
    let nav: NavDoc = project(read_table(&nav_path)?, &nav_path)?;
    let chapters_dir = dir.join(CHAPTERS_DIR);
    let chapters = decode_chapters(&nav.chapters, &chapters_dir, &nav_path, "")?;

    let raw = RawBookFields {
        status: doc.status,
        date_published_start: date_text(doc.date_published_start, "date_published_start", &book_path)?,
        date_published_end: date_text(doc.date_published_end, "date_published_end", &book_path)?,
    };

    debug!(book = %dir_name(dir), chapters = chapters.len(), "decoded book");

    Ok(Book {
        unique_id: doc
            .unique_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| dir_name(dir)),
        title: doc.title,
        titles_alternate: doc.titles_alternate,
        subtitle: doc.subtitle,
        short_description: doc.short_description,
        about: doc.about,
        url: doc.url.trim().to_string(),
        language_code: doc
            .language_code
            .unwrap_or_else(|| language_code.to_string()),
        authors: doc.authors,
        contributors: doc.contributors,
        publishers: doc.publishers,
        tags: doc.tags,
        series: doc.series,
        edition: doc.edition,
        links: doc.links,
        mirrors: doc.mirrors,
        cover_image: doc.cover_image,
        assets: doc.assets,
        ids: doc.ids,
        copyright: doc.copyright,
        license: doc.license,
        params: params_from_table(table),
        chapters,
        input_path: dir.to_path_buf(),
        raw,
        ..Default::default()
    })
}

/// Decode sibling nav entries in parallel. `parent` is the dotted position
/// of the enclosing entry (`"2.1"`), empty at the top level.
fn decode_chapters(
    entries: &[NavEntry],
    chapters_dir: &Path,
    nav_path: &Path,
    parent: &str,
) -> Result<Vec<Chapter>, DecodeError> {
    let numbered: Vec<(String, &NavEntry)> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let position = if parent.is_empty() {
                (i + 1).to_string()
            } else {
                format!("{parent}.{}", i + 1)
            };
            (position, entry)
        })
        .collect();

    join_all(&numbered, |(position, entry)| {
        decode_chapter(entry, chapters_dir, nav_path, position)
    })
}

fn decode_chapter(
    entry: &NavEntry,
    chapters_dir: &Path,
    nav_path: &Path,
    position: &str,
) -> Result<Chapter, DecodeError> {
    if !entry.has_identifier() {
        return Err(DecodeError::MissingChapterIdentifier {
            path: nav_path.to_path_buf(),
            position: position.to_string(),
        });
    }

    let file = entry
        .file
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());
    if let Some(file) = file.filter(|f| !is_safe_relative_path(f)) {
        return Err(DecodeError::UnsafeChapterFile {
            path: nav_path.to_path_buf(),
            position: position.to_string(),
            file: file.to_string(),
        });
    }
    let (content, input_path) = match file {
        Some(file) => {
            let path = chapters_dir.join(file);
            let raw = fs::read(&path).map_err(|source| DecodeError::Read {
                path: path.clone(),
                source,
            })?;
            (Content::new(raw), Some(path))
        }
        None => (Content::default(), None),
    };

    let chapters = decode_chapters(&entry.chapters, chapters_dir, nav_path, position)?;

    let raw = RawChapterFields {
        date_published: date_text(entry.date_published.clone(), "date_published", nav_path)?,
        date_modified: date_text(entry.date_modified.clone(), "date_modified", nav_path)?,
    };

    debug!(position = %position, file = ?file, "decoded chapter");

    Ok(Chapter {
        unique_id: entry.unique_id.clone(),
        title: entry.title.clone(),
        subtitle: entry.subtitle.clone(),
        short_description: entry.short_description.clone(),
        file: file.map(str::to_string),
        content,
        authors_note: entry.authors_note.clone(),
        language_code: entry.language_code.clone().unwrap_or_default(),
        authors: entry.authors.clone(),
        contributors: entry.contributors.clone(),
        links: entry.links.clone(),
        extra: params_from_table(entry.extra.clone()),
        chapters,
        input_path,
        raw,
        ..Default::default()
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn read_table(path: &Path) -> Result<toml::Table, DecodeError> {
    let text = fs::read_to_string(path).map_err(|source| DecodeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| DecodeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Typed projection of a raw table. Absent keys take their defaults.
fn project<T: DeserializeOwned>(table: toml::Table, path: &Path) -> Result<T, DecodeError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|source| DecodeError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Move `keys` out of `table` into a new table. What remains in `table` is
/// the parameter bag.
fn take_keys(table: &mut toml::Table, keys: &[&str]) -> toml::Table {
    keys.iter()
        .filter_map(|key| table.remove(*key).map(|value| (key.to_string(), value)))
        .collect()
}

/// Date fields may be written as strings (`"2024-05"`), TOML dates
/// (`2024-05-01`) or bare years (`2024`). Returns the text for the
/// validator to parse.
fn date_text(
    value: Option<toml::Value>,
    field: &str,
    path: &Path,
) -> Result<Option<String>, DecodeError> {
    match value {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s)),
        Some(toml::Value::Datetime(d)) => Ok(Some(d.to_string())),
        Some(toml::Value::Integer(year)) => Ok(Some(year.to_string())),
        Some(other) => Err(DecodeError::FieldType {
            path: path.to_path_buf(),
            field: field.to_string(),
            found: other.type_str(),
        }),
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
