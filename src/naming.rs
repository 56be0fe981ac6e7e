//! Identifier and filename conventions shared by every entity type.
//!
//! All entities (books, chapters, profiles, series) are addressed by a
//! *unique ID*: a trimmed, lowercased string. IDs double as output path
//! segments, so the same normalization applies everywhere:
//!
//! - `"  Intro "` → `"intro"`
//! - `"The-Long-Night"` → `"the-long-night"`
//!
//! When an entity declares no ID, one is derived from another field. For
//! chapters the fallback chain ends at the source file name, with the
//! extension stripped (`"intro.md"` → `"intro"`).
//!
//! Since IDs and tags become directory and file names under the output
//! directory, [`is_safe_segment`] rejects anything that would leave its
//! parent: separators, `.` and `..`. Source file references (chapter files,
//! image names) may have sub-directories but must pass
//! [`is_safe_relative_path`].

use std::path::{Component, Path};

/// Normalize a unique ID: trim surrounding whitespace and lowercase.
///
/// Idempotent: normalizing an already-normalized ID returns it unchanged.
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize a tag. Tags follow the same rule as IDs.
pub fn normalize_tag(raw: &str) -> String {
    normalize_id(raw)
}

/// File name without its directory or final extension.
///
/// - `"intro.md"` → `"intro"`
/// - `"part-1/intro.md"` → `"intro"`
/// - `"notes.draft.md"` → `"notes.draft"`
/// - `"README"` → `"README"`
pub fn source_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// True when `id` names exactly one path component below its parent.
///
/// - `"dawn"`, `"part.1"`, `"..dawn"` → safe
/// - `"a/b"`, `"a\\b"`, `"."`, `".."` → unsafe
pub fn is_safe_segment(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}

/// True when `path` is relative and never climbs with `..`.
///
/// - `"intro.md"`, `"part-1/intro.md"`, `"./intro.md"` → safe
/// - `"/etc/passwd"`, `"../other/intro.md"`, `"a/../../b"` → unsafe
pub fn is_safe_relative_path(path: &str) -> bool {
    if path.starts_with(['/', '\\']) || path.contains('\0') {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && !path.split(['/', '\\']).any(|part| part == "..")
}

/// Join URL path segments onto a base URL with exactly one `/` between parts.
///
/// Returns an empty string for an empty base, so entities without a site
/// URL stay without one.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let base = base.trim();
    if base.is_empty() {
        return String::new();
    }
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    url
}
