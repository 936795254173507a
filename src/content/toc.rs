use crate::content::scan::{self, TagKind, TagToken};
use crate::content::slug::SlugRegistry;
use crate::models::TocItem;
use scraper::Html;
use serde::Serialize;
use std::ops::Range;

/// Below this many headings the article is rendered without a TOC.
pub const MIN_TOC_ITEMS: usize = 3;

/// Id assigned to the heading whose start tag spans `open_tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub open_tag: Range<usize>,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headings {
    pub toc: Vec<TocItem>,
    /// In document order, one per TOC item.
    pub anchors: Vec<Anchor>,
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        _ => None,
    }
}

/// Visible text of a heading's inner HTML, whitespace collapsed.
fn heading_text(inner_html: &str) -> String {
    let fragment = Html::parse_fragment(inner_html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds `h2`..`h4` headings and assigns each a unique anchor id.
pub fn extract_headings(html: &str) -> Headings {
    let mut registry = SlugRegistry::default();
    let mut headings = Headings::default();
    let mut open: Option<(TagToken, u8)> = None;

    for tag in scan::tags(html) {
        match open.take() {
            None => {
                if tag.kind == TagKind::Start {
                    open = heading_level(&tag.name).map(|level| (tag, level));
                }
            }
            Some((start, level)) => {
                if tag.kind == TagKind::End && tag.name == start.name {
                    let text = heading_text(&html[start.span.end..tag.span.start]);
                    if text.is_empty() {
                        continue;
                    }
                    let id = registry.assign(&text);
                    headings.toc.push(TocItem {
                        id: id.clone(),
                        text,
                        level,
                    });
                    headings.anchors.push(Anchor {
                        open_tag: start.span,
                        id,
                    });
                } else if let Some(next) =
                    heading_level(&tag.name).filter(|_| tag.kind == TagKind::Start)
                {
                    // The previous heading was never closed.
                    open = Some((tag, next));
                } else {
                    open = Some((start, level));
                }
            }
        }
    }

    headings
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableOfContents {
    items: Vec<TocItem>,
}

impl TableOfContents {
    pub fn new(items: Vec<TocItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[TocItem] {
        &self.items
    }

    /// The items, or `None` when there are too few to be worth a TOC.
    pub fn visible(&self) -> Option<&[TocItem]> {
        (self.items.len() >= MIN_TOC_ITEMS).then_some(self.items.as_slice())
    }
}
