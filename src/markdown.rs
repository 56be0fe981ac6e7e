//! Markdown → HTML conversion for [`Content`] values.

use crate::config::MarkdownConfig;
use crate::content::{self, Content};
use pulldown_cmark::{Options, Parser, html as md_html};
use std::convert::Infallible;

/// Parser options for the enabled extensions.
pub fn options(config: &MarkdownConfig) -> Options {
    let mut options = Options::empty();
    options.set(Options::ENABLE_TABLES, config.tables);
    options.set(Options::ENABLE_FOOTNOTES, config.footnotes);
    options.set(Options::ENABLE_STRIKETHROUGH, config.strikethrough);
    options.set(Options::ENABLE_TASKLISTS, config.tasklists);
    options.set(Options::ENABLE_SMART_PUNCTUATION, config.smart_punctuation);
    options.set(Options::ENABLE_HEADING_ATTRIBUTES, config.heading_ids);
    options
}

pub fn to_html(source: &str, options: Options) -> String {
    let parser = Parser::new_ext(source, options);
    let mut html = String::with_capacity(source.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}

/// Store the HTML rendering on `content` unless it already has one.
pub fn render_content(content: &mut Content, options: Options) {
    let Ok(_) = content.render_with(content::HTML, |raw| {
        Ok::<_, Infallible>(to_html(&String::from_utf8_lossy(raw), options))
    });
}
