//! CLI output formatting.
//!
//! Every display has a `format_*` function returning lines, and a `print_*`
//! wrapper that writes them to stdout. Format functions do no I/O.
//!
//! # Site
//!
//! ```text
//! Shelf (2 books)
//! 001 Dawn [dawn] completed, 3 chapters
//!     Source: books/dawn
//!     001 Arrival
//!     002 Road
//!         003 Inn
//! 002 Dusk [dusk] ongoing, 1 chapter
//!     Source: books/dusk
//!     001 Prologue
//!
//! Profiles
//!     Ada [ada] 2 books
//!
//! Series
//!     The Saga [saga] 2 books
//!
//! Tags
//!     fantasy: dawn, dusk
//! ```
//!
//! Chapter numbers follow the reading order across nesting levels.
//!
//! # Render
//!
//! ```text
//! Wrote 6 pages, 2 static files, 1 image → dist
//! FAILED books/dawn/chapters/road.html (_chapter.html)
//!     undefined value (in _chapter.html:3)
//! ```

use crate::render::{PageFailure, RenderSummary};
use crate::types::{Chapter, Index};
use std::path::Path;

/// 1-based position, zero-padded to three digits.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Four spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn chapter_lines(chapters: &[Chapter], depth: usize, position: &mut usize, lines: &mut Vec<String>) {
    for chapter in chapters {
        *position += 1;
        lines.push(format!(
            "{}{} {}",
            indent(depth),
            format_index(*position),
            chapter.title
        ));
        chapter_lines(&chapter.chapters, depth + 1, position, lines);
    }
}

fn count_chapters(chapters: &[Chapter]) -> usize {
    chapters
        .iter()
        .map(|c| 1 + count_chapters(&c.chapters))
        .sum()
}

/// Inventory of a loaded site: books with their chapter trees, then the
/// cross-reference indexes.
pub fn format_site(index: &Index) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        index.title,
        plural(index.books.len(), "book")
    )];

    for (i, book) in index.books.iter().enumerate() {
        lines.push(format!(
            "{} {} [{}] {}, {}",
            format_index(i + 1),
            book.title,
            book.unique_id,
            book.status,
            plural(count_chapters(&book.chapters), "chapter")
        ));
        let source = book
            .input_path
            .strip_prefix(&index.input_path)
            .unwrap_or(&book.input_path);
        lines.push(format!("{}Source: {}", indent(1), source.display()));
        let mut position = 0;
        chapter_lines(&book.chapters, 1, &mut position, &mut lines);
    }

    if !index.profiles.is_empty() {
        lines.push(String::new());
        lines.push("Profiles".to_string());
        for entry in &index.profiles {
            lines.push(format!(
                "{}{} [{}] {}",
                indent(1),
                entry.profile.name,
                entry.profile.unique_id,
                plural(entry.books().len(), "book")
            ));
        }
    }

    if !index.series.is_empty() {
        lines.push(String::new());
        lines.push("Series".to_string());
        for series in &index.series {
            lines.push(format!(
                "{}{} [{}] {}",
                indent(1),
                series.info.name,
                series.unique_id,
                plural(series.books.len(), "book")
            ));
        }
    }

    if !index.tags.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        for tag in &index.tags {
            lines.push(format!("{}{}: {}", indent(1), tag.tag, tag.books.join(", ")));
        }
    }

    lines
}

pub fn print_site(index: &Index) {
    for line in format_site(index) {
        println!("{}", line);
    }
}

/// One header line with the counts, followed by every failed page.
pub fn format_render_summary(summary: &RenderSummary, output: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Wrote {}, {}, {} → {}",
        plural(summary.pages, "page"),
        plural(summary.static_files, "static file"),
        plural(summary.images, "image"),
        output.display()
    )];
    lines.extend(format_failures(&summary.failures));
    lines
}

pub fn format_failures(failures: &[PageFailure]) -> Vec<String> {
    let mut lines = Vec::new();
    for failure in failures {
        lines.push(format!(
            "FAILED {} ({})",
            failure.page.display(),
            failure.template
        ));
        for line in failure.message.lines() {
            lines.push(format!("{}{}", indent(1), line));
        }
    }
    lines
}

pub fn print_render_summary(summary: &RenderSummary, output: &Path) {
    for line in format_render_summary(summary, output) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Book, ProfileIndex, Profile, SeriesIndex, SeriesMember, Status, TagIndex};
    use std::path::PathBuf;

    fn chapter(title: &str, children: Vec<Chapter>) -> Chapter {
        Chapter {
            unique_id: title.to_lowercase(),
            title: title.to_string(),
            chapters: children,
            ..Default::default()
        }
    }

    fn sample_index() -> Index {
        Index {
            title: "Shelf".into(),
            input_path: PathBuf::from("/site"),
            books: vec![
                Book {
                    unique_id: "dawn".into(),
                    title: "Dawn".into(),
                    input_path: PathBuf::from("/site/books/dawn"),
                    chapters: vec![
                        chapter("Arrival", vec![]),
                        chapter("Road", vec![chapter("Inn", vec![])]),
                    ],
                    ..Default::default()
                },
                Book {
                    unique_id: "dusk".into(),
                    title: "Dusk".into(),
                    status: Status::Ongoing,
                    input_path: PathBuf::from("/site/books/dusk"),
                    chapters: vec![chapter("Prologue", vec![])],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(0, "book"), "0 books");
        assert_eq!(plural(1, "book"), "1 book");
        assert_eq!(plural(2, "static file"), "2 static files");
    }

    #[test]
    fn count_chapters_includes_nested() {
        let index = sample_index();
        assert_eq!(count_chapters(&index.books[0].chapters), 3);
    }

    // =========================================================================
    // Site
    // =========================================================================

    #[test]
    fn format_site_books_and_chapters() {
        let lines = format_site(&sample_index());
        assert_eq!(
            lines,
            vec![
                "Shelf (2 books)",
                "001 Dawn [dawn] completed, 3 chapters",
                "    Source: books/dawn",
                "    001 Arrival",
                "    002 Road",
                "        003 Inn",
                "002 Dusk [dusk] ongoing, 1 chapter",
                "    Source: books/dusk",
                "    001 Prologue",
            ]
        );
    }

    #[test]
    fn format_site_cross_references() {
        let mut index = sample_index();
        index.profiles = vec![ProfileIndex {
            profile: Profile {
                unique_id: "ada".into(),
                name: "Ada".into(),
                ..Default::default()
            },
            authored: vec!["dawn".into()],
            published: vec!["dawn".into(), "dusk".into()],
            ..Default::default()
        }];
        index.series = vec![SeriesIndex {
            unique_id: "saga".into(),
            books: vec![SeriesMember {
                book_id: "dawn".into(),
                entry_number: 1.0,
            }],
            ..Default::default()
        }];
        index.series[0].info.name = "The Saga".into();
        index.tags = vec![TagIndex {
            tag: "fantasy".into(),
            books: vec!["dawn".into(), "dusk".into()],
        }];

        let lines = format_site(&index);
        let tail: Vec<&str> = lines[9..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "",
                "Profiles",
                "    Ada [ada] 2 books",
                "",
                "Series",
                "    The Saga [saga] 1 book",
                "",
                "Tags",
                "    fantasy: dawn, dusk",
            ]
        );
    }

    #[test]
    fn format_site_empty() {
        let index = Index {
            title: "Empty".into(),
            ..Default::default()
        };
        assert_eq!(format_site(&index), vec!["Empty (0 books)"]);
    }

    // =========================================================================
    // Render
    // =========================================================================

    #[test]
    fn format_render_summary_clean() {
        let summary = RenderSummary {
            pages: 5,
            static_files: 2,
            images: 1,
            failures: vec![],
        };
        assert_eq!(
            format_render_summary(&summary, Path::new("dist")),
            vec!["Wrote 5 pages, 2 static files, 1 image → dist"]
        );
    }

    #[test]
    fn format_failures_indents_message_lines() {
        let failures = vec![PageFailure {
            page: PathBuf::from("books/dawn/chapters/road.html"),
            template: "_chapter.html".into(),
            message: "undefined value\ncaused by: missing".into(),
        }];
        assert_eq!(
            format_failures(&failures),
            vec![
                "FAILED books/dawn/chapters/road.html (_chapter.html)",
                "    undefined value",
                "    caused by: missing",
            ]
        );
    }
}
