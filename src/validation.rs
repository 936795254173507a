use crate::content::slugify;
use crate::models::{CategoryId, PostStatus, TagId};
use crate::params::non_blank;
use crate::store::{CategoryWrite, PostWrite, TagWrite};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const MAX_TITLE: usize = 200;
pub const MAX_SLUG: usize = 200;
pub const MAX_EXCERPT: usize = 500;
pub const MAX_SEO_TITLE: usize = 70;
pub const MAX_SEO_DESCRIPTION: usize = 160;
pub const MAX_NAME: usize = 100;
pub const MAX_DESCRIPTION: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every violation found in one submission, in the order fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

/// Outcome of a write that accepts form input.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    Saved(T),
    Rejected(FieldErrors),
}

impl<T> Submission<T> {
    pub fn saved(self) -> Option<T> {
        match self {
            Self::Saved(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }
}

fn required(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, format!("{} is required", field));
    }
}

fn max_length(errors: &mut FieldErrors, field: &'static str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.push(
                field,
                format!("{} must be at most {} characters", field, max),
            );
        }
    }
}

/// Lowercase ASCII letters and digits in groups joined by single hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('-').all(|part| {
            !part.is_empty()
                && part
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        })
}

/// `#rgb` or `#rrggbb`.
pub fn is_valid_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => {
            (hex.len() == 3 || hex.len() == 6) && hex.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => false,
    }
}

fn check_slug(errors: &mut FieldErrors, slug: &str) {
    if slug.is_empty() {
        errors.push("slug", "slug is required");
    } else if slug.chars().count() > MAX_SLUG {
        errors.push(
            "slug",
            format!("slug must be at most {} characters", MAX_SLUG),
        );
    } else if !is_valid_slug(slug) {
        errors.push(
            "slug",
            "slug may only contain lowercase letters, digits and single hyphens",
        );
    }
}

/// An explicit slug is kept as typed (and checked); a missing one is derived
/// from `source`.
fn resolve_slug(explicit: Option<&str>, source: &str) -> String {
    match non_blank(explicit) {
        Some(slug) => slug.to_string(),
        None => slugify(source),
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(str::to_string)
}

fn unique<T: PartialEq + Copy>(ids: &[T]) -> Vec<T> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PostInput {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub status: Option<PostStatus>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

impl PostInput {
    pub fn slug(&self) -> String {
        resolve_slug(self.slug.as_deref(), &self.title)
    }

    pub fn status(&self) -> PostStatus {
        self.status.unwrap_or(PostStatus::Draft)
    }

    pub fn category_ids(&self) -> Vec<CategoryId> {
        unique(&self.category_ids)
    }

    pub fn tag_ids(&self) -> Vec<TagId> {
        unique(&self.tag_ids)
    }

    /// Field rules that need no lookups.
    pub fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        required(&mut errors, "title", &self.title);
        max_length(&mut errors, "title", Some(self.title.trim()), MAX_TITLE);
        check_slug(&mut errors, &self.slug());
        max_length(&mut errors, "excerpt", self.excerpt.as_deref(), MAX_EXCERPT);
        max_length(
            &mut errors,
            "seo_title",
            self.seo_title.as_deref(),
            MAX_SEO_TITLE,
        );
        max_length(
            &mut errors,
            "seo_description",
            self.seo_description.as_deref(),
            MAX_SEO_DESCRIPTION,
        );
        errors
    }

    pub fn to_write(
        &self,
        slug: String,
        published_at: Option<NaiveDateTime>,
        at: NaiveDateTime,
    ) -> PostWrite {
        PostWrite {
            slug,
            title: self.title.trim().to_string(),
            excerpt: optional(&self.excerpt),
            content: self.content.clone().filter(|c| !c.trim().is_empty()),
            thumbnail: optional(&self.thumbnail),
            status: self.status(),
            seo_title: optional(&self.seo_title),
            seo_description: optional(&self.seo_description),
            published_at,
            at,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl CategoryInput {
    pub fn slug(&self) -> String {
        resolve_slug(self.slug.as_deref(), &self.name)
    }

    pub fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        required(&mut errors, "name", &self.name);
        max_length(&mut errors, "name", Some(self.name.trim()), MAX_NAME);
        check_slug(&mut errors, &self.slug());
        max_length(
            &mut errors,
            "description",
            self.description.as_deref(),
            MAX_DESCRIPTION,
        );
        if let Some(color) = non_blank(self.color.as_deref()) {
            if !is_valid_color(color) {
                errors.push("color", "color must look like #rgb or #rrggbb");
            }
        }
        errors
    }

    pub fn to_write(&self, slug: String) -> CategoryWrite {
        CategoryWrite {
            name: self.name.trim().to_string(),
            slug,
            description: optional(&self.description),
            color: optional(&self.color),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TagInput {
    pub name: String,
    pub slug: Option<String>,
}

impl TagInput {
    pub fn slug(&self) -> String {
        resolve_slug(self.slug.as_deref(), &self.name)
    }

    pub fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        required(&mut errors, "name", &self.name);
        max_length(&mut errors, "name", Some(self.name.trim()), MAX_NAME);
        check_slug(&mut errors, &self.slug());
        errors
    }

    pub fn to_write(&self, slug: String) -> TagWrite {
        TagWrite {
            name: self.name.trim().to_string(),
            slug,
        }
    }
}
