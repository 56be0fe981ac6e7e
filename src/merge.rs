//! Cross-reference merger: folds the profiles, series and tags declared
//! inside each book into canonical index-level entries.
//!
//! Books are visited in scan order (lexicographic directory name). For each
//! book-local entry:
//!
//! - an existing canonical entry with the same identity wins: its
//!   descriptive fields replace the local ones and it gains a back-reference
//!   to the book;
//! - otherwise the local entry seeds a new canonical entry.
//!
//! So when two books describe the same series differently, the description
//! from the first book in scan order is the one every member ends up with.
//!
//! Identity is the normalized unique ID (`index_id` for series), or the
//! normalized name when no ID is given. Identities name the
//! `profiles/<id>/` and `series/<id>/` pages, so they must be a single path
//! segment.

use crate::naming::{is_safe_segment, normalize_id};
use crate::types::{
    Book, Index, Profile, ProfileIndex, SeriesEntry, SeriesIndex, SeriesMember, TagIndex,
};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, PartialEq)]
pub enum MergeError {
    #[error("book '{book}': {kind} #{position} has neither a unique ID nor a name")]
    MissingIdentity {
        book: String,
        kind: &'static str,
        position: usize,
    },
    #[error(
        "book '{book}': {kind} #{position} resolves to \"{id}\", which cannot be used as a path segment (set a unique ID without '/' or '\\')"
    )]
    UnsafeIdentity {
        book: String,
        kind: &'static str,
        position: usize,
        id: String,
    },
}

/// The role a profile is credited with on a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Author,
    Contributor,
    Publisher,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Contributor => "contributor",
            Role::Publisher => "publisher",
        }
    }

    fn books_mut(self, profile: &mut ProfileIndex) -> &mut Vec<String> {
        match self {
            Role::Author => &mut profile.authored,
            Role::Contributor => &mut profile.contributed,
            Role::Publisher => &mut profile.published,
        }
    }
}

/// Rebuild the index's canonical profiles, series and tags from its books.
pub fn merge_index(index: &mut Index) -> Result<(), MergeError> {
    let Index {
        books,
        profiles,
        series,
        tags,
        ..
    } = index;
    profiles.clear();
    series.clear();
    tags.clear();

    for book in books.iter_mut() {
        merge_book(book, profiles, series, tags)?;
    }

    info!(
        profiles = profiles.len(),
        series = series.len(),
        tags = tags.len(),
        "merged cross-references"
    );
    Ok(())
}

fn merge_book(
    book: &mut Book,
    profiles: &mut Vec<ProfileIndex>,
    series: &mut Vec<SeriesIndex>,
    tags: &mut Vec<TagIndex>,
) -> Result<(), MergeError> {
    let book_id = book.unique_id.clone();

    for (i, entry) in book.series.iter_mut().enumerate() {
        merge_series_entry(entry, &book_id, i + 1, series)?;
    }
    for (role, list) in [
        (Role::Author, &mut book.authors),
        (Role::Contributor, &mut book.contributors),
        (Role::Publisher, &mut book.publishers),
    ] {
        for (i, profile) in list.iter_mut().enumerate() {
            merge_profile(profile, &book_id, role, i + 1, profiles)?;
        }
    }
    for tag in &book.tags {
        match tags.iter_mut().find(|t| &t.tag == tag) {
            Some(existing) => push_unique(&mut existing.books, &book_id),
            None => tags.push(TagIndex {
                tag: tag.clone(),
                books: vec![book_id.clone()],
            }),
        }
    }
    Ok(())
}

/// Resolve one book-local series entry against the canonical list.
pub fn merge_series_entry(
    entry: &mut SeriesEntry,
    book_id: &str,
    position: usize,
    series: &mut Vec<SeriesIndex>,
) -> Result<(), MergeError> {
    let id = identity(&entry.index_id, &entry.info.name, book_id, "series", position)?;
    if entry.info.name.is_empty() {
        entry.info.name = entry.index_id.trim().to_string();
    }
    entry.index_id = id.clone();

    let member = SeriesMember {
        book_id: book_id.to_string(),
        entry_number: entry.entry_number,
    };
    match series.iter_mut().find(|s| s.unique_id == id) {
        Some(canonical) => {
            entry.info = canonical.info.clone();
            canonical.books.push(member);
        }
        None => series.push(SeriesIndex {
            unique_id: id,
            info: entry.info.clone(),
            books: vec![member],
        }),
    }
    Ok(())
}

/// Resolve one book-local profile against the canonical list and credit the
/// book under `role`.
pub fn merge_profile(
    profile: &mut Profile,
    book_id: &str,
    role: Role,
    position: usize,
    profiles: &mut Vec<ProfileIndex>,
) -> Result<(), MergeError> {
    let id = identity(&profile.unique_id, &profile.name, book_id, role.label(), position)?;
    if profile.name.is_empty() {
        profile.name = profile.unique_id.trim().to_string();
    }
    profile.unique_id = id.clone();

    match profiles.iter_mut().find(|p| p.profile.unique_id == id) {
        Some(canonical) => {
            *profile = canonical.profile.clone();
            push_unique(role.books_mut(canonical), book_id);
        }
        None => {
            let mut canonical = ProfileIndex {
                profile: profile.clone(),
                ..Default::default()
            };
            role.books_mut(&mut canonical).push(book_id.to_string());
            profiles.push(canonical);
        }
    }
    Ok(())
}

fn identity(
    id: &str,
    name: &str,
    book: &str,
    kind: &'static str,
    position: usize,
) -> Result<String, MergeError> {
    let id = [id, name]
        .into_iter()
        .map(normalize_id)
        .find(|candidate| !candidate.is_empty())
        .ok_or_else(|| MergeError::MissingIdentity {
            book: book.to_string(),
            kind,
            position,
        })?;
    if !is_safe_segment(&id) {
        return Err(MergeError::UnsafeIdentity {
            book: book.to_string(),
            kind,
            position,
            id,
        });
    }
    Ok(id)
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}
