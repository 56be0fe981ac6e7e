//! Entity types shared by every pipeline stage.
//!
//! The document graph is a plain ownership tree:
//!
//! ```text
//! Index
//! ├── books: Vec<Book>
//! │   └── chapters: Vec<Chapter>     (recursive)
//! ├── profiles: Vec<ProfileIndex>    (built by the merger)
//! ├── series: Vec<SeriesIndex>       (built by the merger)
//! └── tags: Vec<TagIndex>            (built by the merger)
//! ```
//!
//! Every other relation (chapter → book, profile → books, chapter → next
//! chapter) is a unique ID, never a pointer. All types serialize into the
//! template context; field names are what layouts see.

use crate::content::Content;
use crate::datetime::PublishDate;
use crate::params::Params;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Publication status of a book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Completed,
    Ongoing,
    Hiatus,
    Inactive,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Completed,
        Status::Ongoing,
        Status::Hiatus,
        Status::Inactive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Completed => "completed",
            Status::Ongoing => "ongoing",
            Status::Hiatus => "hiatus",
            Status::Inactive => "inactive",
        }
    }

    /// Case-insensitive lookup, ignoring surrounding whitespace.
    pub fn parse(input: &str) -> Option<Status> {
        let wanted = input.trim().to_lowercase();
        Status::ALL.into_iter().find(|s| s.as_str() == wanted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link to something outside the site: a store page, a mirror, a donation
/// page, a social account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalReference {
    /// Display name. Defaults to the address.
    pub name: String,
    pub address: String,
    pub is_hyperlink: bool,
    /// Alternate addresses for the same resource. Mirrors may not have
    /// mirrors of their own.
    pub mirrors: Vec<ExternalReference>,
}

/// A file shipped alongside a book (cover, illustration, map).
///
/// Files are looked up by `name` in the book's `images/` directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asset {
    pub name: String,
    /// Media type family, e.g. `"image"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Concrete format, e.g. `"webp"`.
    pub format: String,
    pub alternate_text: String,
    pub caption: Content,
    /// Alternative encodings of the same asset, in preference order.
    pub fallbacks: Vec<AssetSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
}

impl Asset {
    /// File names of the asset and all its fallbacks.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.fallbacks.iter().map(|f| f.name.as_str()))
    }
}

/// A person or organization credited on a book or chapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Identity across books. Derived from `name` when unset.
    pub unique_id: String,
    pub name: String,
    pub name_alternate: Vec<String>,
    pub roles: Vec<String>,
    pub short_description: String,
    pub about: Content,
    pub images: Vec<Asset>,
    pub links: Vec<ExternalReference>,
}

/// Descriptive payload of a series, shared by every member book after
/// merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesInfo {
    pub name: String,
    pub name_alternate: Vec<String>,
    pub short_description: String,
    pub about: Content,
    pub ids: BTreeMap<String, String>,
    pub links: Vec<ExternalReference>,
    pub images: Vec<Asset>,
}

/// A book's membership in a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesEntry {
    /// Identity of the series across books. Derived from the series name
    /// when unset.
    pub index_id: String,
    /// Position of this book within the series. Fractional values allow
    /// side stories (`2.5`).
    pub entry_number: f64,
    #[serde(flatten)]
    pub info: SeriesInfo,
}

/// Link from one chapter to a neighbour in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterLink {
    /// Index into the book's flattened reading order.
    pub position: usize,
    pub unique_id: String,
    pub title: String,
}

/// Field text as declared in config, kept until the validator parses it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBookFields {
    pub status: Option<String>,
    pub date_published_start: Option<String>,
    pub date_published_end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChapterFields {
    pub date_published: Option<String>,
    pub date_modified: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Chapter {
    pub unique_id: String,
    pub title: String,
    pub subtitle: String,
    pub short_description: String,
    /// Source file name relative to the book's `chapters/` directory.
    pub file: Option<String>,
    pub content: Content,
    pub authors_note: Content,
    pub language_code: String,
    pub authors: Vec<Profile>,
    pub contributors: Vec<Profile>,
    pub links: Vec<ExternalReference>,
    pub date_published: Option<PublishDate>,
    pub date_modified: Option<PublishDate>,
    /// Navigation entry keys folio does not interpret.
    pub extra: Params,
    pub chapters: Vec<Chapter>,
    pub previous: Option<ChapterLink>,
    pub next: Option<ChapterLink>,
    /// Owning book.
    pub book_id: String,
    pub input_path: Option<PathBuf>,
    #[serde(skip)]
    pub raw: RawChapterFields,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Book {
    pub unique_id: String,
    /// Primary title.
    pub title: String,
    pub titles_alternate: Vec<String>,
    pub subtitle: String,
    pub short_description: String,
    pub about: Content,
    pub url: String,
    pub language_code: String,
    pub authors: Vec<Profile>,
    pub contributors: Vec<Profile>,
    pub publishers: Vec<Profile>,
    pub tags: Vec<String>,
    pub status: Status,
    pub series: Vec<SeriesEntry>,
    pub edition: String,
    pub date_published_start: Option<PublishDate>,
    pub date_published_end: Option<PublishDate>,
    pub links: Vec<ExternalReference>,
    pub mirrors: Vec<ExternalReference>,
    pub cover_image: Option<Asset>,
    pub assets: Vec<Asset>,
    pub ids: BTreeMap<String, String>,
    pub copyright: String,
    pub license: String,
    /// Config keys folio does not interpret.
    pub params: Params,
    pub chapters: Vec<Chapter>,
    /// Book directory (`<root>/books/<dir>`).
    pub input_path: PathBuf,
    #[serde(skip)]
    pub raw: RawBookFields,
}

impl Book {
    /// Primary title followed by the alternates.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str()).chain(self.titles_alternate.iter().map(String::as_str))
    }

    /// Every asset file the book ships, cover first.
    pub fn asset_files(&self) -> impl Iterator<Item = &str> {
        self.cover_image
            .iter()
            .chain(self.assets.iter())
            .flat_map(Asset::file_names)
    }
}

/// Canonical profile with the books it is credited on, per role.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileIndex {
    #[serde(flatten)]
    pub profile: Profile,
    pub authored: Vec<String>,
    pub contributed: Vec<String>,
    pub published: Vec<String>,
}

impl ProfileIndex {
    /// All credited books, without duplicates, in first-credited order.
    pub fn books(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for id in self
            .authored
            .iter()
            .chain(&self.contributed)
            .chain(&self.published)
        {
            if !seen.contains(&id.as_str()) {
                seen.push(id);
            }
        }
        seen
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesMember {
    pub book_id: String,
    pub entry_number: f64,
}

/// Canonical series with its member books in scan order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesIndex {
    pub unique_id: String,
    #[serde(flatten)]
    pub info: SeriesInfo,
    pub books: Vec<SeriesMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagIndex {
    pub tag: String,
    pub books: Vec<String>,
}

/// Root of the document graph, one per content directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Index {
    pub title: String,
    pub short_description: String,
    pub about: Content,
    pub language_code: String,
    pub url: String,
    /// File name of the favicon, relative to the content root.
    pub favicon: String,
    pub params: Params,
    pub books: Vec<Book>,
    pub profiles: Vec<ProfileIndex>,
    pub series: Vec<SeriesIndex>,
    pub tags: Vec<TagIndex>,
    pub input_path: PathBuf,
}

impl Index {
    pub fn book(&self, unique_id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.unique_id == unique_id)
    }
}
