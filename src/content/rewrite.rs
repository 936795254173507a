use crate::content::scan;
use crate::content::toc::Anchor;

/// Writes each anchor's id onto its heading start tag. Bytes outside those
/// start tags are copied through untouched.
pub fn apply_anchors(html: &str, anchors: &[Anchor]) -> String {
    let mut out = String::with_capacity(html.len() + anchors.len() * 16);
    let mut cursor = 0;

    for anchor in anchors {
        debug_assert!(anchor.open_tag.start >= cursor, "anchors must be in document order");
        out.push_str(&html[cursor..anchor.open_tag.start]);
        out.push_str(&scan::set_attribute(
            &html[anchor.open_tag.clone()],
            "id",
            &anchor.id,
        ));
        cursor = anchor.open_tag.end;
    }

    out.push_str(&html[cursor..]);
    out
}
