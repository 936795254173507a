use crate::content::scan::{self, TagKind, TagToken};
use scraper::Html;
use std::borrow::Cow;
use std::ops::Range;
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

const CLASS_STYLE: ClassStyle = ClassStyle::Spaced;

/// Editor language names that the bundled grammars know under another token.
const LANGUAGE_ALIASES: [(&str, &str); 9] = [
    ("typescript", "js"),
    ("ts", "js"),
    ("tsx", "js"),
    ("jsx", "js"),
    ("javascript", "js"),
    ("shell", "bash"),
    ("zsh", "bash"),
    ("console", "bash"),
    ("plaintext", "txt"),
];

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("no grammar for language `{0}`")]
    UnknownLanguage(String),

    #[error("unknown theme `{0}`")]
    UnknownTheme(String),

    #[error(transparent)]
    Syntect(#[from] syntect::Error),
}

/// `<pre><code>` block located in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CodeBlock {
    /// Between the `<code>` start tag and `</code>`.
    body: Range<usize>,
    language: Option<String>,
}

pub struct Highlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    /// Replaces the text of every recognised code block with classed
    /// highlighting markup. Never fails: blocks that cannot be highlighted
    /// keep their text.
    pub fn highlight_html(&self, html: &str) -> String {
        let blocks = code_blocks(html);
        if blocks.is_empty() {
            return html.to_string();
        }

        let mut out = String::with_capacity(html.len() * 2);
        let mut cursor = 0;
        for block in &blocks {
            out.push_str(&html[cursor..block.body.start]);
            out.push_str(&self.render_block(&html[block.body.clone()], block.language.as_deref()));
            cursor = block.body.end;
        }
        out.push_str(&html[cursor..]);
        out
    }

    fn render_block<'a>(&self, body: &'a str, language: Option<&str>) -> Cow<'a, str> {
        let Some(language) = language else {
            return Cow::Borrowed(body);
        };

        let code = code_text(body);
        let result = self.highlight_code(&code, language);
        settle_block(body, &code, language, result)
    }

    fn syntax_for(&self, language: &str) -> Option<&SyntaxReference> {
        let language = language.to_ascii_lowercase();
        let token = LANGUAGE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == language)
            .map_or(language.as_str(), |(_, token)| *token);
        self.syntaxes.find_syntax_by_token(token)
    }

    /// Highlights `code` as `language`, returning the inner markup for a
    /// `<code>` element.
    pub fn highlight_code(&self, code: &str, language: &str) -> Result<String, HighlightError> {
        let syntax = self
            .syntax_for(language)
            .ok_or_else(|| HighlightError::UnknownLanguage(language.to_string()))?;

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(generator.finalize())
    }

    /// CSS for the classes emitted by [`Highlighter::highlight_code`].
    pub fn stylesheet(&self, theme: &str) -> Result<String, HighlightError> {
        let theme = self
            .themes
            .themes
            .get(theme)
            .ok_or_else(|| HighlightError::UnknownTheme(theme.to_string()))?;
        Ok(css_for_theme_with_class_style(theme, CLASS_STYLE)?)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Unknown languages keep the original body; grammar failures fall back to
/// the escaped plain text.
fn settle_block<'a>(
    body: &'a str,
    code: &str,
    language: &str,
    result: Result<String, HighlightError>,
) -> Cow<'a, str> {
    match result {
        Ok(highlighted) => Cow::Owned(highlighted),
        Err(HighlightError::UnknownLanguage(lang)) => {
            tracing::debug!("no grammar for `{}`, leaving code block as is", lang);
            Cow::Borrowed(body)
        }
        Err(e) => {
            tracing::warn!("highlighting `{}` block failed: {}", language, e);
            Cow::Owned(html_escape::encode_text(code).into_owned())
        }
    }
}

/// Plain text of a code block body: tags dropped, entities decoded.
fn code_text(body: &str) -> String {
    if !body.contains('<') {
        return html_escape::decode_html_entities(body).into_owned();
    }
    Html::parse_fragment(body).root_element().text().collect()
}

fn language_hint(tag: &str) -> Option<String> {
    let attrs = scan::attributes(tag);

    let declared = attrs
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case("data-language"))
        .and_then(|a| a.value)
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(language) = declared {
        return Some(language.to_ascii_lowercase());
    }

    attrs
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case("class"))
        .and_then(|a| a.value)
        .and_then(|classes| {
            classes.split_whitespace().find_map(|class| {
                class
                    .strip_prefix("language-")
                    .or_else(|| class.strip_prefix("lang-"))
            })
        })
        .filter(|lang| !lang.is_empty())
        .map(str::to_ascii_lowercase)
}

fn is(tag: &TagToken, name: &str, kind: TagKind) -> bool {
    tag.kind == kind && tag.name == name
}

/// Locates `<pre>` elements whose only child is a `<code>` element.
fn code_blocks(html: &str) -> Vec<CodeBlock> {
    let tokens: Vec<TagToken> = scan::tags(html).collect();
    let blank = |range: Range<usize>| html[range].trim().is_empty();

    let mut blocks = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let pre = &tokens[i];
        if !is(pre, "pre", TagKind::Start) {
            i += 1;
            continue;
        }

        let Some(code) = tokens.get(i + 1) else { break };
        if !is(code, "code", TagKind::Start) || !blank(pre.span.end..code.span.start) {
            i += 1;
            continue;
        }

        let Some(code_end) = tokens[i + 2..]
            .iter()
            .position(|t| is(t, "code", TagKind::End))
            .map(|offset| i + 2 + offset)
        else {
            break;
        };

        let closes_pre = tokens.get(code_end + 1).is_some_and(|t| {
            is(t, "pre", TagKind::End) && blank(tokens[code_end].span.end..t.span.start)
        });
        if !closes_pre {
            i = code_end + 1;
            continue;
        }

        let language = language_hint(&html[code.span.clone()])
            .or_else(|| language_hint(&html[pre.span.clone()]));
        blocks.push(CodeBlock {
            body: code.span.end..tokens[code_end].span.start,
            language,
        });
        i = code_end + 2;
    }

    blocks
}
