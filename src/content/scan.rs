//! Tolerant tag scanner over raw HTML.
//!
//! The pipeline edits a handful of spans (heading start tags, code block
//! bodies) and must leave every other byte alone, so it works on byte offsets
//! instead of a parsed tree.

use std::ops::Range;

/// Elements whose body is raw text and never contains tags.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    /// Lower-cased element name.
    pub name: String,
    pub kind: TagKind,
    /// From `<` to one past `>`.
    pub span: Range<usize>,
}

pub struct Tags<'a> {
    html: &'a str,
    pos: usize,
}

pub fn tags(html: &str) -> Tags<'_> {
    Tags { html, pos: 0 }
}

impl Iterator for Tags<'_> {
    type Item = TagToken;

    fn next(&mut self) -> Option<TagToken> {
        let html = self.html;
        let bytes = html.as_bytes();

        loop {
            let start = self.pos + html.get(self.pos..)?.find('<')?;
            let rest = &html[start..];

            if let Some(comment) = rest.strip_prefix("<!--") {
                self.pos = comment
                    .find("-->")
                    .map_or(html.len(), |end| start + 4 + end + 3);
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos = rest.find('>').map_or(html.len(), |end| start + end + 1);
                continue;
            }

            let (kind, name_start) = if rest.starts_with("</") {
                (TagKind::End, start + 2)
            } else {
                (TagKind::Start, start + 1)
            };

            let name_len = bytes[name_start.min(bytes.len())..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
                .count();
            if name_len == 0 || !bytes[name_start].is_ascii_alphabetic() {
                // A bare `<` in text.
                self.pos = start + 1;
                continue;
            }

            let name_end = name_start + name_len;
            let Some(end) = tag_end(html, name_end) else {
                self.pos = html.len();
                return None;
            };

            let name = html[name_start..name_end].to_ascii_lowercase();
            self.pos = end;
            if kind == TagKind::Start && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                self.pos = raw_text_end(html, end, &name);
            }

            return Some(TagToken {
                name,
                kind,
                span: start..end,
            });
        }
    }
}

/// Offset one past the `>` closing a tag, ignoring `>` inside quoted values.
fn tag_end(html: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (offset, byte) in html.as_bytes()[from..].iter().enumerate() {
        match (quote, *byte) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(*byte),
            (None, b'>') => return Some(from + offset + 1),
            _ => {}
        }
    }
    None
}

/// Offset of the `</name` that ends a raw-text element, or the end of input.
fn raw_text_end(html: &str, from: usize, name: &str) -> usize {
    let closing_len = name.len() + 2;
    let mut pos = from;
    while let Some(offset) = html[pos..].find("</") {
        let candidate = pos + offset;
        let matches = html
            .get(candidate + 2..candidate + closing_len)
            .is_some_and(|found| found.eq_ignore_ascii_case(name));
        if matches {
            return candidate;
        }
        pos = candidate + 2;
    }
    html.len()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    /// Raw value, entities not decoded.
    pub value: Option<&'a str>,
    /// Covers the name through the end of the value, relative to the tag.
    pub span: Range<usize>,
}

/// Attributes of a start tag such as `<code class="language-rs">`.
pub fn attributes(tag: &str) -> Vec<Attribute<'_>> {
    let bytes = tag.as_bytes();
    let mut attrs = Vec::new();

    let mut pos = 1 + bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
        .count();

    loop {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'/') {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] == b'>' {
            break;
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let name = &tag[name_start..pos];

        let mut lookahead = pos;
        while lookahead < bytes.len() && bytes[lookahead].is_ascii_whitespace() {
            lookahead += 1;
        }

        if lookahead < bytes.len() && bytes[lookahead] == b'=' {
            pos = lookahead + 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let value = match bytes.get(pos) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let value_start = pos + 1;
                    let value_end = tag[value_start..]
                        .find(q as char)
                        .map_or(tag.len(), |offset| value_start + offset);
                    pos = (value_end + 1).min(tag.len());
                    &tag[value_start..value_end]
                }
                _ => {
                    let value_start = pos;
                    while pos < bytes.len()
                        && !bytes[pos].is_ascii_whitespace()
                        && bytes[pos] != b'>'
                    {
                        pos += 1;
                    }
                    &tag[value_start..pos]
                }
            };
            attrs.push(Attribute {
                name,
                value: Some(value),
                span: name_start..pos,
            });
        } else {
            attrs.push(Attribute {
                name,
                value: None,
                span: name_start..pos,
            });
        }
    }

    attrs
}

/// Returns `tag` with `name` set to `value`, overwriting an existing
/// attribute of that name or inserting it right after the element name.
pub fn set_attribute(tag: &str, name: &str, value: &str) -> String {
    let rendered = format!(
        "{}=\"{}\"",
        name,
        html_escape::encode_double_quoted_attribute(value)
    );

    if let Some(existing) = attributes(tag)
        .into_iter()
        .find(|attr| attr.name.eq_ignore_ascii_case(name))
    {
        let mut out = String::with_capacity(tag.len() + rendered.len());
        out.push_str(&tag[..existing.span.start]);
        out.push_str(&rendered);
        out.push_str(&tag[existing.span.end..]);
        return out;
    }

    let name_end = 1 + tag.as_bytes()[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
        .count();
    let mut out = String::with_capacity(tag.len() + rendered.len() + 1);
    out.push_str(&tag[..name_end]);
    out.push(' ');
    out.push_str(&rendered);
    out.push_str(&tag[name_end..]);
    out
}
