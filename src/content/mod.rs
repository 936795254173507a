//! Article rendering: heading anchors, table of contents, code highlighting
//! and reading time. Everything here is a pure function of its input.

pub mod highlight;
pub mod reading_time;
pub mod rewrite;
pub mod scan;
pub mod slug;
pub mod toc;

pub use highlight::Highlighter;
pub use reading_time::{calculate_reading_time, ReadingTime, WORDS_PER_MINUTE};
pub use slug::slugify;
pub use toc::{extract_headings, TableOfContents, MIN_TOC_ITEMS};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedArticle {
    pub html: String,
    pub toc: TableOfContents,
    pub reading_time: ReadingTime,
}

pub fn render_article(content: Option<&str>, highlighter: &Highlighter) -> RenderedArticle {
    let raw = content.unwrap_or_default();

    let headings = extract_headings(raw);
    let anchored = rewrite::apply_anchors(raw, &headings.anchors);
    let html = highlighter.highlight_html(&anchored);

    RenderedArticle {
        html,
        toc: TableOfContents::new(headings.toc),
        reading_time: calculate_reading_time(content),
    }
}
