use personal_site::content::rewrite::apply_anchors;
use personal_site::content::{
    calculate_reading_time, extract_headings, render_article, Highlighter, TableOfContents,
};
use personal_site::models::TocItem;

fn item(id: &str, text: &str, level: u8) -> TocItem {
    TocItem {
        id: id.to_string(),
        text: text.to_string(),
        level,
    }
}

#[test]
fn repeated_headings_get_numbered_anchors() {
    let content = "<h2>Intro</h2><p>text</p><h2>Intro</h2>";
    let headings = extract_headings(content);
    assert_eq!(
        headings.toc,
        vec![item("intro", "Intro", 2), item("intro-2", "Intro", 2)]
    );

    let html = apply_anchors(content, &headings.anchors);
    assert_eq!(
        html,
        "<h2 id=\"intro\">Intro</h2><p>text</p><h2 id=\"intro-2\">Intro</h2>"
    );
}

#[test]
fn extraction_is_stable_over_rewritten_output() {
    let content = "<h2>Setup</h2><h3>Install <code>cargo</code></h3><h2>Setup</h2><h4>Done!</h4>";
    let first = extract_headings(content);
    let rewritten = apply_anchors(content, &first.anchors);
    let second = extract_headings(&rewritten);

    let ids = |toc: &[TocItem]| toc.iter().map(|i| i.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first.toc), ids(&second.toc));
    assert_eq!(apply_anchors(&rewritten, &second.anchors), rewritten);
}

#[test]
fn identical_headings_always_get_distinct_ids() {
    let content = "<h3>FAQ</h3>".repeat(12);
    let toc = extract_headings(&content).toc;
    assert_eq!(toc.len(), 12);

    let mut ids: Vec<_> = toc.iter().map(|i| i.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 12);
}

#[test]
fn toc_needs_three_headings_to_show() {
    let two = TableOfContents::new(extract_headings("<h2>A</h2><h2>B</h2>").toc);
    assert!(two.visible().is_none());

    let three = TableOfContents::new(extract_headings("<h2>A</h2><h2>B</h2><h3>C</h3>").toc);
    assert_eq!(three.visible().map(<[TocItem]>::len), Some(3));
}

#[test]
fn reading_time_of_missing_content_is_one_minute() {
    for content in [None, Some("")] {
        let estimate = calculate_reading_time(content);
        assert_eq!((estimate.word_count, estimate.reading_time), (0, 1));
    }
}

#[test]
fn reading_time_scales_with_words() {
    let content = format!("<p>{}</p>", "word ".repeat(400));
    let estimate = calculate_reading_time(Some(&content));
    assert_eq!((estimate.word_count, estimate.reading_time), (400, 2));
}

#[test]
fn rendered_article_anchors_headings_and_highlights_code() {
    let highlighter = Highlighter::new();
    let content = concat!(
        "<h2>Intro</h2><p>text</p>",
        "<pre><code class=\"language-rust\">fn main() {}</code></pre>",
        "<h2>Intro</h2>",
    );
    let article = render_article(Some(content), &highlighter);

    assert!(article.html.starts_with("<h2 id=\"intro\">Intro</h2><p>text</p>"));
    assert!(article.html.ends_with("<h2 id=\"intro-2\">Intro</h2>"));
    assert!(article.html.contains("<pre><code class=\"language-rust\">"));
    assert!(article.html.contains("<span class=\""));
    assert_eq!(article.toc.items().len(), 2);
    assert!(article.toc.visible().is_none());
    assert_eq!(article.reading_time.reading_time, 1);
}

#[test]
fn unknown_languages_pass_through() {
    let highlighter = Highlighter::new();
    let content = "<pre><code class=\"language-nope\">a &lt; b</code></pre>";
    assert_eq!(render_article(Some(content), &highlighter).html, content);
}
