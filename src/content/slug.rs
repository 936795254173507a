use std::collections::HashSet;

/// Anchor used when a heading has no ASCII letters or digits.
const FALLBACK_SLUG: &str = "section";

/// Lower-cases `text`, collapses every run of characters outside `[a-z0-9]`
/// into one hyphen and drops leading/trailing hyphens.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Hands out anchors that are unique within one document.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    taken: HashSet<String>,
}

impl SlugRegistry {
    pub fn assign(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = FALLBACK_SLUG.to_string();
        }

        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }

        self.taken.insert(candidate.clone());
        candidate
    }
}
