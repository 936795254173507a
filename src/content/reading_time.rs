use scraper::{Html, Node};
use serde::Serialize;

pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadingTime {
    pub word_count: usize,
    /// Whole minutes, never below one.
    pub reading_time: u32,
}

/// Text nodes of an HTML fragment, skipping script and style bodies.
fn visible_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());

    for node in fragment.tree.root().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .is_some_and(|name| name == "script" || name == "style");
        if !hidden {
            text.push_str(chunk);
            text.push(' ');
        }
    }

    text
}

pub fn calculate_reading_time(content: Option<&str>) -> ReadingTime {
    let word_count = match content {
        Some(html) if !html.trim().is_empty() => visible_text(html)
            .split_whitespace()
            .count(),
        _ => 0,
    };

    let minutes = (word_count as f64 / WORDS_PER_MINUTE as f64).round().max(1.0);

    ReadingTime {
        word_count,
        reading_time: minutes as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn empty_or_missing_content_reads_in_one_minute() {
        let floor = ReadingTime {
            word_count: 0,
            reading_time: 1,
        };
        assert_eq!(calculate_reading_time(None), floor);
        assert_eq!(calculate_reading_time(Some("")), floor);
        assert_eq!(calculate_reading_time(Some("<p> </p>")), floor);
    }

    #[test]
    fn four_hundred_words_take_two_minutes() {
        let html = format!("<p>{}</p>", words(400));
        assert_eq!(
            calculate_reading_time(Some(&html)),
            ReadingTime {
                word_count: 400,
                reading_time: 2
            }
        );
    }

    #[test]
    fn minutes_are_rounded() {
        assert_eq!(calculate_reading_time(Some(&words(299))).reading_time, 1);
        assert_eq!(calculate_reading_time(Some(&words(300))).reading_time, 2);
        assert_eq!(calculate_reading_time(Some(&words(50))).reading_time, 1);
    }

    #[test]
    fn tags_separate_words_and_every_token_counts() {
        let html = "<p>one</p><p>two <em>three</em> — four →</p><script>var hidden = 1;</script>";
        assert_eq!(calculate_reading_time(Some(html)).word_count, 6);
    }
}
