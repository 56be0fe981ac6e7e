//! Validator: normalizes a decoded graph in place and returns the first
//! violation.
//!
//! Per book, in order:
//!
//! 1. Self-normalization: IDs trimmed and lowercased, a missing title taken
//!    from the ID (or the other way round), URL derived from the site URL.
//! 2. Required fields: unique ID, title, language code; no duplicate titles.
//!    IDs must be usable as a single output path segment.
//! 3. Enumerations and dates: status, publication dates.
//! 4. Tags: trimmed, lowercased, deduplicated.
//! 5. Nested entities: profiles, references, series, assets, then the
//!    chapter tree depth-first.
//! 6. Chapter IDs unique within the book.
//!
//! After every book passes, book IDs must be unique across the index.
//!
//! Errors carry the offending entity as context, outermost first:
//! `book 'dawn': chapter 'arrival': invalid date_published "soon"`.

use crate::datetime::PublishDate;
use crate::naming::{
    is_safe_relative_path, is_safe_segment, join_url, normalize_id, normalize_tag, source_stem,
};
use crate::types::{Asset, Book, Chapter, ExternalReference, Index, Profile, SeriesEntry, Status};
use thiserror::Error;
use tracing::{debug, info};

/// Deepest allowed mirror level below a top-level reference.
pub const MAX_REFERENCE_DEPTH: usize = 1;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("{entity} is missing a unique ID (must contain at least 1 non-space character)")]
    MissingUniqueId { entity: &'static str },
    #[error(
        "{entity} ID \"{id}\" cannot be used as a path segment (must not contain '/' or '\\' or be '.' or '..')"
    )]
    UnsafeUniqueId { entity: &'static str, id: String },
    #[error("duplicate {entity} ID \"{id}\" at positions {first} and {second}")]
    DuplicateUniqueId {
        entity: &'static str,
        id: String,
        first: String,
        second: String,
    },
    #[error("missing title")]
    MissingTitle,
    #[error("missing language code")]
    MissingLanguageCode,
    #[error("duplicate title \"{title}\" at positions {first} and {second}")]
    DuplicateTitle {
        title: String,
        first: usize,
        second: usize,
    },
    #[error(
        "unrecognized status \"{value}\" (must be one of, case-insensitive: completed, ongoing, hiatus, inactive)"
    )]
    UnrecognizedStatus { value: String },
    #[error("invalid {field} \"{value}\"")]
    InvalidDate { field: &'static str, value: String },
    #[error("tag #{position} is empty (must contain at least 1 non-space character)")]
    EmptyTag { position: usize },
    #[error("reference is missing a name")]
    ReferenceMissingName,
    #[error("reference \"{name}\" is missing an address")]
    ReferenceMissingAddress { name: String },
    #[error(
        "reference \"{top_level}\": mirror \"{nested}\" cannot have mirrors of its own (too many nested levels)"
    )]
    ReferenceTooDeep { top_level: String, nested: String },
    #[error("asset is missing a name")]
    AssetMissingName,
    #[error("asset \"{name}\" must be a relative path inside the images directory")]
    UnsafeAssetName { name: String },
    #[error(
        "asset \"{asset}\": fallback \"{fallback}\" has type \"{found}\" but the asset type is \"{expected}\""
    )]
    AssetTypeMismatch {
        asset: String,
        fallback: String,
        expected: String,
        found: String,
    },
    #[error("book '{book}': {source}")]
    InBook {
        book: String,
        #[source]
        source: Box<ValidationError>,
    },
    #[error("chapter '{chapter}': {source}")]
    InChapter {
        chapter: String,
        #[source]
        source: Box<ValidationError>,
    },
    #[error("profile '{profile}': {source}")]
    InProfile {
        profile: String,
        #[source]
        source: Box<ValidationError>,
    },
    #[error("series '{series}': {source}")]
    InSeries {
        series: String,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// The innermost error, without entity context.
    pub fn root_cause(&self) -> &ValidationError {
        match self {
            ValidationError::InBook { source, .. }
            | ValidationError::InChapter { source, .. }
            | ValidationError::InProfile { source, .. }
            | ValidationError::InSeries { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Validate every book of the index, in scan order.
pub fn validate_index(index: &mut Index) -> Result<(), ValidationError> {
    let site_url = index.url.clone();
    for book in &mut index.books {
        let declared = book.unique_id.clone();
        validate_book(book, &site_url).map_err(|e| ValidationError::InBook {
            book: if book.unique_id.is_empty() { declared } else { book.unique_id.clone() },
            source: Box::new(e),
        })?;
    }
    check_duplicate_ids(
        "book",
        index
            .books
            .iter()
            .enumerate()
            .map(|(i, b)| ((i + 1).to_string(), b.unique_id.as_str())),
    )?;
    info!(books = index.books.len(), "validated");
    Ok(())
}

/// Normalize and check one book. `site_url` is used to derive the book URL
/// when none is set.
pub fn validate_book(book: &mut Book, site_url: &str) -> Result<(), ValidationError> {
    book.unique_id = normalize_id(&book.unique_id);
    book.title = book.title.trim().to_string();
    if book.title.is_empty() {
        book.title = book.unique_id.clone();
    }
    if book.unique_id.is_empty() {
        book.unique_id = normalize_id(&book.title);
    }
    if book.unique_id.is_empty() {
        return Err(ValidationError::MissingUniqueId { entity: "book" });
    }
    check_segment("book", &book.unique_id)?;
    if book.title.is_empty() {
        return Err(ValidationError::MissingTitle);
    }

    book.language_code = book.language_code.trim().to_string();
    if book.language_code.is_empty() {
        return Err(ValidationError::MissingLanguageCode);
    }

    for title in &mut book.titles_alternate {
        *title = title.trim().to_string();
    }
    check_duplicate_titles(book.titles())?;
    book.titles_alternate.retain(|t| !t.is_empty());

    if book.url.is_empty() {
        book.url = join_url(site_url, &["books", &book.unique_id]);
    }

    book.status = match book.raw.status.as_deref().map(str::trim) {
        None | Some("") => Status::default(),
        Some(value) => Status::parse(value).ok_or_else(|| ValidationError::UnrecognizedStatus {
            value: value.to_string(),
        })?,
    };
    book.date_published_start =
        parse_date(book.raw.date_published_start.as_deref(), "date_published_start")?;
    book.date_published_end =
        parse_date(book.raw.date_published_end.as_deref(), "date_published_end")?;

    normalize_tags(&mut book.tags)?;

    for profile in book
        .authors
        .iter_mut()
        .chain(book.contributors.iter_mut())
        .chain(book.publishers.iter_mut())
    {
        validate_profile(profile)?;
    }
    for reference in book.links.iter_mut().chain(book.mirrors.iter_mut()) {
        validate_reference(reference)?;
    }
    for entry in &mut book.series {
        validate_series_entry(entry)?;
    }
    for asset in book.cover_image.iter_mut().chain(book.assets.iter_mut()) {
        validate_asset(asset)?;
    }

    let book_id = book.unique_id.clone();
    let language = book.language_code.clone();
    for chapter in &mut book.chapters {
        validate_chapter(chapter, &book_id, &language)?;
    }
    check_duplicate_ids("chapter", chapter_positions(&book.chapters).into_iter())?;

    debug!(book = %book.unique_id, "validated book");
    Ok(())
}

/// Resolve a chapter's identity and check it and its sub-chapters.
///
/// The ID comes from the first of `unique_id`, `title` or the source file
/// stem that is present. A missing title falls back to the declared ID,
/// then the file stem.
pub fn validate_chapter(
    chapter: &mut Chapter,
    book_id: &str,
    language_code: &str,
) -> Result<(), ValidationError> {
    let declared_id = chapter.unique_id.trim().to_string();
    let stem = chapter.file.as_deref().map(source_stem).unwrap_or_default();

    chapter.title = chapter.title.trim().to_string();
    chapter.unique_id = [declared_id.as_str(), chapter.title.as_str(), stem.as_str()]
        .into_iter()
        .map(normalize_id)
        .find(|id| !id.is_empty())
        .unwrap_or_default();
    if chapter.unique_id.is_empty() {
        return Err(ValidationError::MissingUniqueId { entity: "chapter" });
    }
    check_segment("chapter", &chapter.unique_id)?;
    if chapter.title.is_empty() {
        chapter.title = if declared_id.is_empty() { stem } else { declared_id };
    }

    chapter.book_id = book_id.to_string();
    chapter.language_code = chapter.language_code.trim().to_string();
    if chapter.language_code.is_empty() {
        chapter.language_code = language_code.to_string();
    }

    check_chapter_fields(chapter).map_err(|e| ValidationError::InChapter {
        chapter: chapter.unique_id.clone(),
        source: Box::new(e),
    })?;

    let language = chapter.language_code.clone();
    let label = chapter.unique_id.clone();
    for sub in &mut chapter.chapters {
        validate_chapter(sub, book_id, &language).map_err(|e| ValidationError::InChapter {
            chapter: label.clone(),
            source: Box::new(e),
        })?;
    }
    Ok(())
}

fn check_chapter_fields(chapter: &mut Chapter) -> Result<(), ValidationError> {
    chapter.date_published = parse_date(chapter.raw.date_published.as_deref(), "date_published")?;
    chapter.date_modified = parse_date(chapter.raw.date_modified.as_deref(), "date_modified")?;
    for profile in chapter.authors.iter_mut().chain(chapter.contributors.iter_mut()) {
        validate_profile(profile)?;
    }
    for reference in &mut chapter.links {
        validate_reference(reference)?;
    }
    Ok(())
}

/// Reject a title that appears twice. Positions are 1-based over the
/// declared list, primary title first; empty entries are skipped but still
/// counted.
pub fn check_duplicate_titles<'a>(
    titles: impl Iterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen: Vec<(usize, &str)> = Vec::new();
    for (i, title) in titles.enumerate() {
        if title.is_empty() {
            continue;
        }
        if let Some((first, _)) = seen.iter().find(|(_, t)| *t == title) {
            return Err(ValidationError::DuplicateTitle {
                title: title.to_string(),
                first: first + 1,
                second: i + 1,
            });
        }
        seen.push((i, title));
    }
    Ok(())
}

/// Reject an ID that appears twice among `(position, id)` pairs.
pub fn check_duplicate_ids<'a>(
    entity: &'static str,
    ids: impl Iterator<Item = (String, &'a str)>,
) -> Result<(), ValidationError> {
    let mut seen: Vec<(String, &str)> = Vec::new();
    for (position, id) in ids {
        if let Some((first, _)) = seen.iter().find(|(_, seen_id)| *seen_id == id) {
            return Err(ValidationError::DuplicateUniqueId {
                entity,
                id: id.to_string(),
                first: first.clone(),
                second: position,
            });
        }
        seen.push((position, id));
    }
    Ok(())
}

/// Chapter IDs in reading order with dotted tree positions: `"1"`, `"1.1"`,
/// `"2"`.
pub fn chapter_positions(chapters: &[Chapter]) -> Vec<(String, &str)> {
    fn walk<'a>(chapters: &'a [Chapter], prefix: &str, out: &mut Vec<(String, &'a str)>) {
        for (i, chapter) in chapters.iter().enumerate() {
            let position = if prefix.is_empty() {
                (i + 1).to_string()
            } else {
                format!("{prefix}.{}", i + 1)
            };
            out.push((position.clone(), chapter.unique_id.as_str()));
            walk(&chapter.chapters, &position, out);
        }
    }
    let mut out = Vec::new();
    walk(chapters, "", &mut out);
    out
}

fn check_segment(entity: &'static str, id: &str) -> Result<(), ValidationError> {
    if is_safe_segment(id) {
        Ok(())
    } else {
        Err(ValidationError::UnsafeUniqueId {
            entity,
            id: id.to_string(),
        })
    }
}

/// Trim, lowercase and deduplicate tags in place, keeping first occurrences.
pub fn normalize_tags(tags: &mut Vec<String>) -> Result<(), ValidationError> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for (i, tag) in tags.iter().enumerate() {
        let tag = normalize_tag(tag);
        if tag.is_empty() {
            return Err(ValidationError::EmptyTag { position: i + 1 });
        }
        check_segment("tag", &tag)?;
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    *tags = normalized;
    Ok(())
}

fn parse_date(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<PublishDate>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => PublishDate::parse(text)
            .map(Some)
            .ok_or_else(|| ValidationError::InvalidDate {
                field,
                value: text.to_string(),
            }),
    }
}

/// Check a top-level reference and its mirrors.
pub fn validate_reference(reference: &mut ExternalReference) -> Result<(), ValidationError> {
    check_reference(reference, None, 0)
}

fn check_reference(
    reference: &mut ExternalReference,
    top_level: Option<&str>,
    level: usize,
) -> Result<(), ValidationError> {
    reference.name = reference.name.trim().to_string();
    reference.address = reference.address.trim().to_string();
    if reference.name.is_empty() {
        reference.name = reference.address.clone();
    }
    if reference.name.is_empty() {
        return Err(ValidationError::ReferenceMissingName);
    }
    if reference.address.is_empty() {
        return Err(ValidationError::ReferenceMissingAddress {
            name: reference.name.clone(),
        });
    }

    let top_level = top_level.unwrap_or(&reference.name).to_string();
    if level > MAX_REFERENCE_DEPTH {
        return Err(ValidationError::ReferenceTooDeep {
            top_level,
            nested: reference.name.clone(),
        });
    }
    for mirror in &mut reference.mirrors {
        check_reference(mirror, Some(&top_level), level + 1)?;
    }
    Ok(())
}

pub fn validate_asset(asset: &mut Asset) -> Result<(), ValidationError> {
    asset.name = asset.name.trim().to_string();
    if asset.name.is_empty() {
        return Err(ValidationError::AssetMissingName);
    }
    check_asset_name(&asset.name)?;
    for fallback in &mut asset.fallbacks {
        fallback.name = fallback.name.trim().to_string();
        if fallback.name.is_empty() {
            return Err(ValidationError::AssetMissingName);
        }
        check_asset_name(&fallback.name)?;
        if !asset.kind.is_empty() && !fallback.kind.is_empty() && fallback.kind != asset.kind {
            return Err(ValidationError::AssetTypeMismatch {
                asset: asset.name.clone(),
                fallback: fallback.name.clone(),
                expected: asset.kind.clone(),
                found: fallback.kind.clone(),
            });
        }
    }
    Ok(())
}

fn check_asset_name(name: &str) -> Result<(), ValidationError> {
    if is_safe_relative_path(name) {
        Ok(())
    } else {
        Err(ValidationError::UnsafeAssetName {
            name: name.to_string(),
        })
    }
}

/// Check a profile's links and images. Identity is resolved by the merger.
pub fn validate_profile(profile: &mut Profile) -> Result<(), ValidationError> {
    profile.name = profile.name.trim().to_string();
    let label = if profile.name.is_empty() {
        profile.unique_id.trim().to_string()
    } else {
        profile.name.clone()
    };
    check_links_and_images(&mut profile.links, &mut profile.images).map_err(|e| {
        ValidationError::InProfile {
            profile: label,
            source: Box::new(e),
        }
    })
}

pub fn validate_series_entry(entry: &mut SeriesEntry) -> Result<(), ValidationError> {
    entry.info.name = entry.info.name.trim().to_string();
    let label = if entry.info.name.is_empty() {
        entry.index_id.trim().to_string()
    } else {
        entry.info.name.clone()
    };
    check_links_and_images(&mut entry.info.links, &mut entry.info.images).map_err(|e| {
        ValidationError::InSeries {
            series: label,
            source: Box::new(e),
        }
    })
}

fn check_links_and_images(
    links: &mut [ExternalReference],
    images: &mut [Asset],
) -> Result<(), ValidationError> {
    for reference in links {
        validate_reference(reference)?;
    }
    for image in images {
        validate_asset(image)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetSource, RawBookFields, RawChapterFields};

    fn book(id: &str) -> Book {
        Book {
            unique_id: id.to_string(),
            language_code: "en".to_string(),
            ..Default::default()
        }
    }

    fn chapter_with_file(file: &str) -> Chapter {
        Chapter {
            file: Some(file.to_string()),
            ..Default::default()
        }
    }

    fn reference(name: &str, address: &str) -> ExternalReference {
        ExternalReference {
            name: name.to_string(),
            address: address.to_string(),
            ..Default::default()
        }
    }

    // =========================================================================
    // Book identity
    // =========================================================================

    #[test]
    fn book_id_normalized_and_title_derived() {
        let mut b = book("  Dawn-Saga ");
        validate_book(&mut b, "").unwrap();
        assert_eq!(b.unique_id, "dawn-saga");
        assert_eq!(b.title, "dawn-saga");
    }

    #[test]
    fn book_id_derived_from_title() {
        let mut b = book("");
        b.title = " The Dawn ".into();
        validate_book(&mut b, "").unwrap();
        assert_eq!(b.unique_id, "the dawn");
        assert_eq!(b.title, "The Dawn");
    }

    #[test]
    fn book_without_id_or_title_fails() {
        let mut b = book("   ");
        assert_eq!(
            validate_book(&mut b, ""),
            Err(ValidationError::MissingUniqueId { entity: "book" })
        );
    }

    #[test]
    fn book_without_language_fails() {
        let mut b = book("dawn");
        b.language_code = " ".into();
        assert_eq!(
            validate_book(&mut b, ""),
            Err(ValidationError::MissingLanguageCode)
        );
    }

    #[test]
    fn duplicate_titles_report_positions() {
        let mut b = book("dawn");
        b.title = "Alpha".into();
        b.titles_alternate = vec!["Beta".into(), "Alpha".into()];
        assert_eq!(
            validate_book(&mut b, ""),
            Err(ValidationError::DuplicateTitle {
                title: "Alpha".into(),
                first: 1,
                second: 3,
            })
        );
    }

    #[test]
    fn empty_alternate_titles_keep_their_positions() {
        let mut b = book("dawn");
        b.title = "Dawn".into();
        b.titles_alternate = vec!["Alpha".into(), "  ".into(), "Alpha".into()];
        assert_eq!(
            validate_book(&mut b, ""),
            Err(ValidationError::DuplicateTitle {
                title: "Alpha".into(),
                first: 2,
                second: 4,
            })
        );
    }

    #[test]
    fn duplicate_title_positions_count_empty_entries() {
        assert_eq!(
            check_duplicate_titles(["Alpha", "", "Alpha"].into_iter()),
            Err(ValidationError::DuplicateTitle {
                title: "Alpha".into(),
                first: 1,
                second: 3,
            })
        );
    }

    #[test]
    fn empty_alternate_titles_are_dropped() {
        let mut b = book("dawn");
        b.titles_alternate = vec![" Dusk ".into(), "".into()];
        validate_book(&mut b, "").unwrap();
        assert_eq!(b.titles_alternate, vec!["Dusk"]);
    }

    #[test]
    fn book_id_with_path_separator_rejected() {
        for id in ["../../../../escaped", "a/b", "..", "a\\b"] {
            let mut b = book(id);
            assert_eq!(
                validate_book(&mut b, ""),
                Err(ValidationError::UnsafeUniqueId {
                    entity: "book",
                    id: id.to_string(),
                }),
                "{id:?}"
            );
        }
    }

    #[test]
    fn book_id_derived_from_unsafe_title_rejected() {
        let mut b = book("");
        b.title = "Either/Or".into();
        assert_eq!(
            validate_book(&mut b, ""),
            Err(ValidationError::UnsafeUniqueId {
                entity: "book",
                id: "either/or".into(),
            })
        );
    }

    #[test]
    fn duplicate_book_ids_rejected() {
        let mut index = Index {
            books: vec![book("dawn"), book("dusk"), book(" DAWN ")],
            ..Default::default()
        };
        assert_eq!(
            validate_index(&mut index),
            Err(ValidationError::DuplicateUniqueId {
                entity: "book",
                id: "dawn".into(),
                first: "1".into(),
                second: "3".into(),
            })
        );
    }

    #[test]
    fn book_url_derived_from_site_url() {
        let mut b = book("Dawn");
        validate_book(&mut b, "https://example.com/").unwrap();
        assert_eq!(b.url, "https://example.com/books/dawn");
    }

    #[test]
    fn explicit_book_url_kept() {
        let mut b = book("dawn");
        b.url = "https://dawn.example".into();
        validate_book(&mut b, "https://example.com").unwrap();
        assert_eq!(b.url, "https://dawn.example");
    }

    // =========================================================================
    // Status and dates
    // =========================================================================

    #[test]
    fn status_defaults_to_completed() {
        let mut b = book("dawn");
        validate_book(&mut b, "").unwrap();
        assert_eq!(b.status, Status::Completed);
    }

    #[test]
    fn status_is_case_insensitive() {
        let mut b = book("dawn");
        b.raw = RawBookFields {
            status: Some("HiAtUs".into()),
            ..Default::default()
        };
        validate_book(&mut b, "").unwrap();
        assert_eq!(b.status, Status::Hiatus);
    }

    #[test]
    fn unrecognized_status_fails() {
        let mut b = book("dawn");
        b.raw.status = Some("abandoned".into());
        let err = validate_book(&mut b, "").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnrecognizedStatus {
                value: "abandoned".into()
            }
        );
        assert!(err.to_string().contains("completed, ongoing, hiatus, inactive"));
    }

    #[test]
    fn dates_parsed() {
        let mut b = book("dawn");
        b.raw.date_published_start = Some("2024-05".into());
        validate_book(&mut b, "").unwrap();
        assert_eq!(
            b.date_published_start.unwrap().to_string(),
            "2024-05-01T00:00:00+00:00"
        );
        assert!(b.date_published_end.is_none());
    }

    #[test]
    fn malformed_date_fails() {
        let mut b = book("dawn");
        b.raw.date_published_end = Some("someday".into());
        assert_eq!(
            validate_book(&mut b, ""),
            Err(ValidationError::InvalidDate {
                field: "date_published_end",
                value: "someday".into()
            })
        );
    }

    // =========================================================================
    // Tags
    // =========================================================================

    #[test]
    fn tags_normalized_and_deduplicated() {
        let mut tags = vec![
            " Fantasy".to_string(),
            "romance".to_string(),
            "FANTASY ".to_string(),
        ];
        normalize_tags(&mut tags).unwrap();
        assert_eq!(tags, vec!["fantasy", "romance"]);
    }

    #[test]
    fn tag_normalization_is_idempotent() {
        let mut tags = vec!["A".to_string(), " b ".to_string(), "a".to_string()];
        normalize_tags(&mut tags).unwrap();
        let once = tags.clone();
        normalize_tags(&mut tags).unwrap();
        assert_eq!(tags, once);
    }

    #[test]
    fn empty_tag_fails_with_position() {
        let mut tags = vec!["ok".to_string(), "  ".to_string()];
        assert_eq!(
            normalize_tags(&mut tags),
            Err(ValidationError::EmptyTag { position: 2 })
        );
    }

    #[test]
    fn tag_with_path_separator_rejected() {
        let mut tags = vec!["sci/fi".to_string()];
        assert_eq!(
            normalize_tags(&mut tags),
            Err(ValidationError::UnsafeUniqueId {
                entity: "tag",
                id: "sci/fi".into(),
            })
        );
    }

    // =========================================================================
    // References
    // =========================================================================

    #[test]
    fn reference_name_defaults_to_address() {
        let mut r = reference("", "https://example.com");
        validate_reference(&mut r).unwrap();
        assert_eq!(r.name, "https://example.com");
    }

    #[test]
    fn reference_without_address_fails() {
        let mut r = reference("Shop", "");
        assert_eq!(
            validate_reference(&mut r),
            Err(ValidationError::ReferenceMissingAddress {
                name: "Shop".into()
            })
        );
    }

    #[test]
    fn reference_without_name_or_address_fails() {
        let mut r = reference(" ", " ");
        assert_eq!(
            validate_reference(&mut r),
            Err(ValidationError::ReferenceMissingName)
        );
    }

    #[test]
    fn one_level_of_mirrors_allowed() {
        let mut r = reference("Shop", "https://shop.example");
        r.mirrors = vec![reference("Mirror", "https://mirror.example")];
        validate_reference(&mut r).unwrap();
    }

    #[test]
    fn nested_mirrors_fail_with_both_names() {
        let mut mirror = reference("Mirror", "https://mirror.example");
        mirror.mirrors = vec![reference("Deep", "https://deep.example")];
        let mut r = reference("Shop", "https://shop.example");
        r.mirrors = vec![mirror];
        assert_eq!(
            validate_reference(&mut r),
            Err(ValidationError::ReferenceTooDeep {
                top_level: "Shop".into(),
                nested: "Deep".into()
            })
        );
    }

    #[test]
    fn book_reference_error_has_book_context() {
        let mut index = Index {
            books: vec![book("dawn")],
            ..Default::default()
        };
        index.books[0].links = vec![reference("Shop", "")];
        let err = validate_index(&mut index).unwrap_err();
        assert_eq!(
            err.to_string(),
            "book 'dawn': reference \"Shop\" is missing an address"
        );
    }

    // =========================================================================
    // Assets, profiles, series
    // =========================================================================

    #[test]
    fn asset_requires_name() {
        let mut asset = Asset::default();
        assert_eq!(
            validate_asset(&mut asset),
            Err(ValidationError::AssetMissingName)
        );
    }

    #[test]
    fn asset_fallback_type_must_match() {
        let mut asset = Asset {
            name: "cover.avif".into(),
            kind: "image".into(),
            fallbacks: vec![AssetSource {
                name: "cover.mp4".into(),
                kind: "video".into(),
                format: "mp4".into(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            validate_asset(&mut asset),
            Err(ValidationError::AssetTypeMismatch { ref found, .. }) if found == "video"
        ));
    }

    #[test]
    fn asset_names_stay_inside_images_dir() {
        let mut asset = Asset {
            name: "covers/dawn.png".into(),
            ..Default::default()
        };
        validate_asset(&mut asset).unwrap();

        for name in ["../../../escaped.png", "/etc/passwd"] {
            let mut asset = Asset {
                name: name.into(),
                ..Default::default()
            };
            assert_eq!(
                validate_asset(&mut asset),
                Err(ValidationError::UnsafeAssetName { name: name.into() })
            );
        }

        let mut asset = Asset {
            name: "cover.avif".into(),
            fallbacks: vec![AssetSource {
                name: "../cover.jpg".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            validate_asset(&mut asset),
            Err(ValidationError::UnsafeAssetName { ref name }) if name == "../cover.jpg"
        ));
    }

    #[test]
    fn asset_fallback_without_type_is_accepted() {
        let mut asset = Asset {
            name: "cover.avif".into(),
            kind: "image".into(),
            fallbacks: vec![AssetSource {
                name: "cover.jpg".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        validate_asset(&mut asset).unwrap();
    }

    #[test]
    fn profile_link_error_names_profile() {
        let mut profile = Profile {
            name: "Ada".into(),
            links: vec![reference("", "")],
            ..Default::default()
        };
        assert_eq!(
            validate_profile(&mut profile).unwrap_err().to_string(),
            "profile 'Ada': reference is missing a name"
        );
    }

    #[test]
    fn series_image_error_names_series() {
        let mut entry = SeriesEntry {
            index_id: "saga".into(),
            ..Default::default()
        };
        entry.info.images = vec![Asset::default()];
        let err = validate_series_entry(&mut entry).unwrap_err();
        assert!(matches!(err, ValidationError::InSeries { ref series, .. } if series == "saga"));
        assert_eq!(err.root_cause(), &ValidationError::AssetMissingName);
    }

    // =========================================================================
    // Chapters
    // =========================================================================

    #[test]
    fn chapter_identity_from_file_only() {
        let mut chapter = chapter_with_file("intro.md");
        validate_chapter(&mut chapter, "dawn", "en").unwrap();
        assert_eq!(chapter.unique_id, "intro");
        assert_eq!(chapter.title, "intro");
    }

    #[test]
    fn chapter_identity_precedence() {
        let mut chapter = chapter_with_file("01-intro.md");
        chapter.title = "Arrival".into();
        validate_chapter(&mut chapter, "dawn", "en").unwrap();
        assert_eq!(chapter.unique_id, "arrival");
        assert_eq!(chapter.title, "Arrival");

        let mut chapter = chapter_with_file("01-intro.md");
        chapter.unique_id = " First ".into();
        chapter.title = "Arrival".into();
        validate_chapter(&mut chapter, "dawn", "en").unwrap();
        assert_eq!(chapter.unique_id, "first");
    }

    #[test]
    fn chapter_title_falls_back_to_declared_id() {
        let mut chapter = Chapter {
            unique_id: "Prologue".into(),
            ..Default::default()
        };
        validate_chapter(&mut chapter, "dawn", "en").unwrap();
        assert_eq!(chapter.unique_id, "prologue");
        assert_eq!(chapter.title, "Prologue");
    }

    #[test]
    fn chapter_without_any_identifier_fails() {
        let mut chapter = Chapter::default();
        assert_eq!(
            validate_chapter(&mut chapter, "dawn", "en"),
            Err(ValidationError::MissingUniqueId { entity: "chapter" })
        );
    }

    #[test]
    fn chapter_inherits_language_and_book() {
        let mut chapter = chapter_with_file("one.md");
        chapter.chapters = vec![Chapter {
            title: "Inner".into(),
            language_code: "fr".into(),
            ..Default::default()
        }];
        validate_chapter(&mut chapter, "dawn", "de").unwrap();
        assert_eq!(chapter.language_code, "de");
        assert_eq!(chapter.book_id, "dawn");
        assert_eq!(chapter.chapters[0].language_code, "fr");
        assert_eq!(chapter.chapters[0].book_id, "dawn");
    }

    #[test]
    fn chapter_id_from_title_must_be_a_single_segment() {
        let mut chapter = chapter_with_file("one.md");
        chapter.title = "Then/Now".into();
        assert_eq!(
            validate_chapter(&mut chapter, "dawn", "en"),
            Err(ValidationError::UnsafeUniqueId {
                entity: "chapter",
                id: "then/now".into(),
            })
        );

        let mut chapter = chapter_with_file("one.md");
        chapter.unique_id = "..".into();
        assert!(matches!(
            validate_chapter(&mut chapter, "dawn", "en"),
            Err(ValidationError::UnsafeUniqueId { entity: "chapter", .. })
        ));
    }

    #[test]
    fn chapters_sharing_a_title_rejected() {
        let mut b = book("dawn");
        let mut first = chapter_with_file("a.md");
        first.title = "Interlude".into();
        let mut second = chapter_with_file("b.md");
        second.title = "Interlude".into();
        b.chapters = vec![first, second];
        assert_eq!(
            validate_book(&mut b, ""),
            Err(ValidationError::DuplicateUniqueId {
                entity: "chapter",
                id: "interlude".into(),
                first: "1".into(),
                second: "2".into(),
            })
        );
    }

    #[test]
    fn duplicate_chapter_ids_across_levels_report_dotted_positions() {
        let mut b = book("dawn");
        let mut one = chapter_with_file("one.md");
        one.chapters = vec![chapter_with_file("one-a.md"), chapter_with_file("two.md")];
        b.chapters = vec![one, chapter_with_file("two.md")];

        let mut index = Index {
            books: vec![b],
            ..Default::default()
        };
        let err = validate_index(&mut index).unwrap_err();
        assert_eq!(
            err.root_cause(),
            &ValidationError::DuplicateUniqueId {
                entity: "chapter",
                id: "two".into(),
                first: "1.2".into(),
                second: "2".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "book 'dawn': duplicate chapter ID \"two\" at positions 1.2 and 2"
        );
    }

    #[test]
    fn chapter_positions_are_dotted_in_reading_order() {
        let mut one = chapter_with_file("one.md");
        one.unique_id = "one".into();
        let mut inner = chapter_with_file("one-a.md");
        inner.unique_id = "one-a".into();
        let mut deeper = chapter_with_file("one-a-i.md");
        deeper.unique_id = "one-a-i".into();
        inner.chapters = vec![deeper];
        one.chapters = vec![inner];
        let mut two = chapter_with_file("two.md");
        two.unique_id = "two".into();
        let chapters = vec![one, two];

        assert_eq!(
            chapter_positions(&chapters),
            vec![
                ("1".to_string(), "one"),
                ("1.1".to_string(), "one-a"),
                ("1.1.1".to_string(), "one-a-i"),
                ("2".to_string(), "two"),
            ]
        );
    }

    #[test]
    fn nested_chapter_error_carries_path() {
        let mut b = book("dawn");
        let mut outer = chapter_with_file("one.md");
        outer.chapters = vec![Chapter {
            title: "Two".into(),
            raw: RawChapterFields {
                date_published: Some("soon".into()),
                ..Default::default()
            },
            ..Default::default()
        }];
        b.chapters = vec![outer];
        let mut index = Index {
            books: vec![b],
            ..Default::default()
        };
        let err = validate_index(&mut index).unwrap_err();
        assert_eq!(
            err.to_string(),
            "book 'dawn': chapter 'one': chapter 'two': invalid date_published \"soon\""
        );
    }
}
