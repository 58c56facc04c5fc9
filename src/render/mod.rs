//! HTML preview of a block tree.
//!
//! The tree is written out as canonical Markdown and rendered by comrak with
//! the GFM extensions the codec's dialect uses.

use crate::document::Block;
use crate::markdown;

/// Render `blocks` as an HTML fragment.
pub fn to_html(blocks: &[Block]) -> String {
    markdown_to_html(&markdown::serialize(blocks))
}

/// Render Markdown text as an HTML fragment.
pub fn markdown_to_html(text: &str) -> String {
    let _span = tracing::trace_span!("render.html", bytes = text.len()).entered();
    let mut options = comrak::Options::default();

    // GFM extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;

    // Anchors for the outline
    options.extension.header_ids = Some(String::new());

    comrak::markdown_to_html(text, &options)
}
