//! Renderer/Writer: executes layouts against the linked index and writes the
//! output tree.
//!
//! ## Layouts
//!
//! The layouts directory holds Jinja templates plus any static files. Six
//! names are reserved for page templates and are never copied:
//!
//! | Template | Page | Context |
//! |----------|------|---------|
//! | `index.html` | `/index.html` | `index` |
//! | `_book.html` | `/books/<book>/index.html` | `index`, `book`, `chapters` |
//! | `_chapter.html` | `/books/<book>/chapters/<chapter>.html` | `index`, `book`, `chapter` |
//! | `_profile.html` | `/profiles/<profile>/index.html` | `index`, `profile` |
//! | `_series.html` | `/series/<series>/index.html` | `index`, `series` |
//! | `_tag.html` | `/tags/<tag>/index.html` | `index`, `tag` |
//!
//! Profile, series and tag pages are only written when their template
//! exists.
//! Everything else in the layouts directory (stylesheets, scripts, partials)
//! is copied verbatim to the output root.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── favicon.ico                # when the site names one
//! ├── style.css                  # static layout files
//! ├── books/
//! │   └── dawn/
//! │       ├── index.html
//! │       ├── images/            # cover and declared assets
//! │       └── chapters/
//! │           ├── arrival.html
//! │           └── road.html
//! ├── profiles/<id>/index.html
//! ├── series/<id>/index.html
//! └── tags/<tag>/index.html
//! ```
//!
//! ## Failures
//!
//! A page whose template fails to load or execute does not stop the build.
//! Its output file gets an error page carrying the failure text, the failure
//! is logged and recorded, and after every page has been written the whole
//! render returns [`RenderError::Pages`].

use crate::helpers::TemplateHelpers;
use crate::link::flatten;
use crate::markdown::render_content;
use crate::types::{Asset, Book, Chapter, Index, Profile, SeriesInfo};
use maud::{DOCTYPE, Markup, html};
use minijinja::{Environment, UndefinedBehavior, Value, context, path_loader};
use pulldown_cmark::Options;
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const INDEX_TEMPLATE: &str = "index.html";
pub const BOOK_TEMPLATE: &str = "_book.html";
pub const CHAPTER_TEMPLATE: &str = "_chapter.html";
pub const PROFILE_TEMPLATE: &str = "_profile.html";
pub const SERIES_TEMPLATE: &str = "_series.html";
pub const TAG_TEMPLATE: &str = "_tag.html";

/// Template names that are never copied as static files.
pub const RESERVED_TEMPLATES: [&str; 6] = [
    INDEX_TEMPLATE,
    BOOK_TEMPLATE,
    CHAPTER_TEMPLATE,
    PROFILE_TEMPLATE,
    SERIES_TEMPLATE,
    TAG_TEMPLATE,
];

/// CSS class on the `<body>` of every error page.
pub const ERROR_MARKER: &str = "folio-build-error";

const ERROR_CSS: &str = "body{font-family:monospace;margin:2rem;color:#611a15;background:#fdecea}\
pre{white-space:pre-wrap;padding:1rem;border:1px solid #f5c2c0;background:#fff}";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("layouts directory not found: {0}")]
    MissingLayouts(PathBuf),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("{} of {} pages failed to render", .0.failures.len(), .0.pages)]
    Pages(RenderSummary),
}

/// A page that was replaced by an error page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    /// Output path relative to the output root.
    pub page: PathBuf,
    pub template: String,
    pub message: String,
}

/// What a render wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSummary {
    /// Pages written, error pages included.
    pub pages: usize,
    pub static_files: usize,
    pub images: usize,
    pub failures: Vec<PageFailure>,
}

pub struct Renderer {
    env: Environment<'static>,
    layouts_dir: PathBuf,
    markdown: Options,
}

impl Renderer {
    /// Set up a template environment over `layouts_dir` with `helpers`
    /// installed as globals.
    pub fn new(
        layouts_dir: impl Into<PathBuf>,
        helpers: TemplateHelpers,
        markdown: Options,
    ) -> Result<Self, RenderError> {
        let layouts_dir = layouts_dir.into();
        if !layouts_dir.is_dir() {
            return Err(RenderError::MissingLayouts(layouts_dir));
        }
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_loader(path_loader(&layouts_dir));
        helpers.install(&mut env);
        Ok(Self {
            env,
            layouts_dir,
            markdown,
        })
    }

    pub fn layouts_dir(&self) -> &Path {
        &self.layouts_dir
    }

    /// Convert every piece of content in the index to HTML, then write the
    /// site to `output`.
    pub fn render(&self, index: &mut Index, output: &Path) -> Result<RenderSummary, RenderError> {
        self.prepare(index);
        self.write(index, output)
    }

    /// Cache the HTML rendering on every [`Content`](crate::content::Content) reachable from the index.
    pub fn prepare(&self, index: &mut Index) {
        let options = self.markdown;
        render_content(&mut index.about, options);
        for book in &mut index.books {
            prepare_book(book, options);
        }
        for entry in &mut index.profiles {
            prepare_profile(&mut entry.profile, options);
        }
        for series in &mut index.series {
            prepare_series(&mut series.info, options);
        }
    }

    /// Write the output tree for an already prepared index.
    pub fn write(&self, index: &Index, output: &Path) -> Result<RenderSummary, RenderError> {
        info!(output = %output.display(), "rendering site");
        create_dir(output)?;

        let mut summary = RenderSummary {
            static_files: self.copy_static(output)?,
            ..Default::default()
        };
        if !index.favicon.is_empty() {
            copy_favicon(index, output)?;
            summary.static_files += 1;
        }

        let index_value = Value::from_serialize(index);
        self.page(
            INDEX_TEMPLATE,
            Path::new("index.html"),
            context! { index => index_value.clone() },
            output,
            &mut summary,
        )?;

        for book in &index.books {
            summary.images += copy_book_images(book, output)?;
            self.book_pages(book, &index_value, output, &mut summary)?;
        }

        if self.has_template(PROFILE_TEMPLATE) {
            for entry in &index.profiles {
                let page = Path::new("profiles")
                    .join(&entry.profile.unique_id)
                    .join("index.html");
                let ctx = context! { index => index_value.clone(), profile => entry };
                self.page(PROFILE_TEMPLATE, &page, ctx, output, &mut summary)?;
            }
        }
        if self.has_template(SERIES_TEMPLATE) {
            for series in &index.series {
                let page = Path::new("series").join(&series.unique_id).join("index.html");
                let ctx = context! { index => index_value.clone(), series => series };
                self.page(SERIES_TEMPLATE, &page, ctx, output, &mut summary)?;
            }
        }
        if self.has_template(TAG_TEMPLATE) {
            for tag in &index.tags {
                let page = Path::new("tags").join(&tag.tag).join("index.html");
                let ctx = context! { index => index_value.clone(), tag => tag };
                self.page(TAG_TEMPLATE, &page, ctx, output, &mut summary)?;
            }
        }

        info!(
            pages = summary.pages,
            static_files = summary.static_files,
            images = summary.images,
            failed = summary.failures.len(),
            "site rendered"
        );
        if summary.failures.is_empty() {
            Ok(summary)
        } else {
            Err(RenderError::Pages(summary))
        }
    }

    fn book_pages(
        &self,
        book: &Book,
        index_value: &Value,
        output: &Path,
        summary: &mut RenderSummary,
    ) -> Result<(), RenderError> {
        let book_dir = Path::new("books").join(&book.unique_id);
        let book_value = Value::from_serialize(book);
        let reading_order = flatten(&book.chapters);

        let ctx = context! {
            index => index_value.clone(),
            book => book_value.clone(),
            chapters => Value::from_serialize(&reading_order),
        };
        self.page(BOOK_TEMPLATE, &book_dir.join("index.html"), ctx, output, summary)?;

        for chapter in reading_order {
            let page = book_dir
                .join("chapters")
                .join(format!("{}.html", chapter.unique_id));
            let ctx = context! {
                index => index_value.clone(),
                book => book_value.clone(),
                chapter => chapter,
            };
            self.page(CHAPTER_TEMPLATE, &page, ctx, output, summary)?;
        }
        Ok(())
    }

    /// Render one page. Template failures produce an error page and are
    /// recorded; only I/O failures are returned.
    fn page(
        &self,
        template: &str,
        page: &Path,
        ctx: Value,
        output: &Path,
        summary: &mut RenderSummary,
    ) -> Result<(), RenderError> {
        let html = match self
            .env
            .get_template(template)
            .and_then(|tmpl| tmpl.render(ctx))
        {
            Ok(html) => html,
            Err(err) => {
                let message = error_text(&err);
                warn!(page = %page.display(), template, "{message}");
                summary.failures.push(PageFailure {
                    page: page.to_path_buf(),
                    template: template.to_string(),
                    message: message.clone(),
                });
                error_page(&page.display().to_string(), &message).into_string()
            }
        };

        let path = output.join(page);
        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }
        fs::write(&path, html).map_err(|source| RenderError::Write {
            path: path.clone(),
            source,
        })?;
        summary.pages += 1;
        debug!(page = %page.display(), "wrote page");
        Ok(())
    }

    fn has_template(&self, name: &str) -> bool {
        self.layouts_dir.join(name).is_file()
    }

    /// Copy every non-template file from the layouts directory.
    fn copy_static(&self, output: &Path) -> Result<usize, RenderError> {
        let mut copied = 0;
        for entry in WalkDir::new(&self.layouts_dir).min_depth(1) {
            let entry = entry.map_err(|source| RenderError::Walk {
                path: self.layouts_dir.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.layouts_dir) else {
                continue;
            };
            if is_reserved(rel) {
                continue;
            }
            copy_file(entry.path(), &output.join(rel))?;
            copied += 1;
        }
        debug!(copied, "copied static layout files");
        Ok(copied)
    }
}

fn is_reserved(rel: &Path) -> bool {
    rel.parent() == Some(Path::new(""))
        && rel
            .to_str()
            .is_some_and(|name| RESERVED_TEMPLATES.contains(&name))
}

fn copy_favicon(index: &Index, output: &Path) -> Result<(), RenderError> {
    let from = index.input_path.join(&index.favicon);
    let Some(name) = Path::new(&index.favicon).file_name() else {
        return Err(RenderError::Copy {
            from,
            to: output.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "favicon must name a file",
            ),
        });
    };
    copy_file(&from, &output.join(name))
}

/// Copy the cover and declared assets from `<book>/images/`.
fn copy_book_images(book: &Book, output: &Path) -> Result<usize, RenderError> {
    let source = book.input_path.join(crate::decode::IMAGES_DIR);
    let target = output
        .join("books")
        .join(&book.unique_id)
        .join(crate::decode::IMAGES_DIR);
    let mut copied = 0;
    for name in book.asset_files() {
        copy_file(&source.join(name), &target.join(name))?;
        copied += 1;
    }
    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), RenderError> {
    let copy_err = |source| RenderError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(copy_err)?;
    }
    fs::copy(from, to).map_err(copy_err)?;
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), RenderError> {
    fs::create_dir_all(path).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// The error and its causes, one per line.
fn error_text(err: &minijinja::Error) -> String {
    let mut text = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        text.push_str("\ncaused by: ");
        text.push_str(&inner.to_string());
        cause = inner.source();
    }
    text
}

/// Minimal page shown in place of a page that failed to render.
pub fn error_page(page: &str, message: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Build error: " (page) }
                style { (ERROR_CSS) }
            }
            body class=(ERROR_MARKER) {
                h1 { "Build error" }
                p { "This page failed to render: " code { (page) } }
                pre { (message) }
            }
        }
    }
}

// ============================================================================
// Content preparation
// ============================================================================

fn prepare_book(book: &mut Book, options: Options) {
    render_content(&mut book.about, options);
    for profile in book
        .authors
        .iter_mut()
        .chain(&mut book.contributors)
        .chain(&mut book.publishers)
    {
        prepare_profile(profile, options);
    }
    for entry in &mut book.series {
        prepare_series(&mut entry.info, options);
    }
    for asset in book.cover_image.iter_mut().chain(&mut book.assets) {
        prepare_asset(asset, options);
    }
    for chapter in &mut book.chapters {
        prepare_chapter(chapter, options);
    }
}

fn prepare_chapter(chapter: &mut Chapter, options: Options) {
    render_content(&mut chapter.content, options);
    render_content(&mut chapter.authors_note, options);
    for profile in chapter.authors.iter_mut().chain(&mut chapter.contributors) {
        prepare_profile(profile, options);
    }
    for child in &mut chapter.chapters {
        prepare_chapter(child, options);
    }
}

fn prepare_profile(profile: &mut Profile, options: Options) {
    render_content(&mut profile.about, options);
    for image in &mut profile.images {
        prepare_asset(image, options);
    }
}

fn prepare_series(info: &mut SeriesInfo, options: Options) {
    render_content(&mut info.about, options);
    for image in &mut info.images {
        prepare_asset(image, options);
    }
}

fn prepare_asset(asset: &mut Asset, options: Options) {
    render_content(&mut asset.caption, options);
}
