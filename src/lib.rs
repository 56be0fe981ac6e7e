//! # Folio
//!
//! A static site generator for serialized books and web fiction. A content
//! directory of TOML documents and markdown chapters becomes a site with one
//! page per book and per chapter.
//!
//! # Content Layout
//!
//! ```text
//! content/
//! ├── folio.toml              # site: title, url, language, favicon, [build]
//! ├── layout/                 # templates and static files
//! │   ├── index.html
//! │   ├── _book.html
//! │   ├── _chapter.html
//! │   └── style.css
//! └── books/
//!     └── dawn/
//!         ├── book.toml       # title, authors, series, tags, status, ...
//!         ├── nav.toml        # chapter tree
//!         ├── images/         # cover and assets
//!         └── chapters/
//!             └── arrival.md
//! ```
//!
//! # Pipeline
//!
//! ```text
//! 1. Decode     folio.toml, books/*  →  Index   (loose TOML → typed entities)
//! 2. Validate   Index                →  Index   (normalize IDs, parse dates, check fields)
//! 3. Merge      Index                →  Index   (canonical profiles, series, tags)
//! 4. Link       Index                →  Index   (reading order, previous/next)
//! 5. Render     Index + layout/      →  dist/   (templates, static files, images)
//! ```
//!
//! Stages 1–4 are [`load_site`]; [`build_site`] runs all five. Each stage
//! has its own error type; [`BuildError`] wraps them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`decode`] | Reads the content directory into an unvalidated [`types::Index`] |
//! | [`validate`] | Normalizes IDs and tags, parses dates and status, checks required fields |
//! | [`merge`] | Folds book-local profiles, series and tags into index-level entries |
//! | [`link`] | Chapter reading order and previous/next links |
//! | [`render`] | Runs layouts, copies static files and images, writes error pages |
//! | [`content`] | Raw text with cached rendered formats |
//! | [`markdown`] | Markdown → HTML |
//! | [`helpers`] | Functions callable from layouts |
//! | [`config`] | The `[build]` table of `folio.toml` |
//! | [`fanout`] | Parallel units joined with first-error-wins |
//! | [`types`] | Entity types shared by every stage |
//! | [`naming`] | ID normalization and URL joining |
//! | [`output`] | CLI output formatting |

pub mod config;
pub mod content;
pub mod datetime;
pub mod decode;
pub mod fanout;
pub mod helpers;
pub mod link;
pub mod markdown;
pub mod merge;
pub mod naming;
pub mod output;
pub mod params;
pub mod render;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;

use helpers::TemplateHelpers;
use render::{RenderSummary, Renderer};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use types::Index;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Decode(#[from] decode::DecodeError),
    #[error("invalid content: {0}")]
    Validation(#[from] validate::ValidationError),
    #[error(transparent)]
    Merge(#[from] merge::MergeError),
    #[error(transparent)]
    Render(#[from] render::RenderError),
}

/// Where a build reads from and writes to.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Overrides `build.layouts_dir`. Relative paths are used as given.
    pub layouts: Option<PathBuf>,
}

/// Decode, validate, merge and link the content directory at `source`.
pub fn load_site(source: &Path) -> Result<Index, BuildError> {
    let mut index = decode::decode_index(source)?;
    validate::validate_index(&mut index)?;
    merge::merge_index(&mut index)?;
    link::link_index(&mut index);
    Ok(index)
}

/// Load the site and render it with the stock template helpers.
pub fn build_site(options: &BuildOptions) -> Result<RenderSummary, BuildError> {
    let mut index = load_site(&options.source)?;
    let config = config::load_config(&options.source)?;

    let layouts = options
        .layouts
        .clone()
        .unwrap_or_else(|| options.source.join(&config.layouts_dir));
    let renderer = Renderer::new(
        layouts,
        TemplateHelpers::numeric(),
        markdown::options(&config.markdown),
    )?;
    let summary = renderer.render(&mut index, &options.output)?;
    info!(books = index.books.len(), "build complete");
    Ok(summary)
}
