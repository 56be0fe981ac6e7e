//! Chapter linker: reading order and previous/next links.
//!
//! A book's chapter forest is read depth-first, parent before children:
//!
//! ```text
//! 1 Arrival          →  [Arrival, Road, Inn, Departure]
//! 2 Road
//!   2.1 Inn
//! 3 Departure
//! ```
//!
//! Links are computed in two passes: first the flattened order is collected
//! from an immutable view, then each chapter is assigned its neighbours by
//! position.

use crate::types::{Book, Chapter, ChapterLink, Index};
use tracing::debug;

/// Chapters of a forest in depth-first pre-order.
pub fn flatten(chapters: &[Chapter]) -> Vec<&Chapter> {
    let mut out = Vec::new();
    collect(chapters, &mut out);
    out
}

fn collect<'a>(chapters: &'a [Chapter], out: &mut Vec<&'a Chapter>) {
    for chapter in chapters {
        out.push(chapter);
        collect(&chapter.chapters, out);
    }
}

/// Assign `previous`/`next` on every chapter of the book. The first chapter
/// has no `previous` and the last no `next`.
pub fn link_book(book: &mut Book) {
    let order: Vec<ChapterLink> = flatten(&book.chapters)
        .into_iter()
        .enumerate()
        .map(|(position, chapter)| ChapterLink {
            position,
            unique_id: chapter.unique_id.clone(),
            title: chapter.title.clone(),
        })
        .collect();

    let mut position = 0;
    assign(&mut book.chapters, &mut position, &order);
    debug!(book = %book.unique_id, chapters = order.len(), "linked chapters");
}

fn assign(chapters: &mut [Chapter], position: &mut usize, order: &[ChapterLink]) {
    for chapter in chapters {
        let i = *position;
        chapter.previous = i.checked_sub(1).and_then(|p| order.get(p)).cloned();
        chapter.next = order.get(i + 1).cloned();
        *position += 1;
        assign(&mut chapter.chapters, position, order);
    }
}

pub fn link_index(index: &mut Index) {
    for book in &mut index.books {
        link_book(book);
    }
}
