use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type PostId = u64;
pub type CategoryId = u64;
pub type TagId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    /// Value of `published_at` after moving a post into `self`.
    ///
    /// Publishing stamps the first publish time; unpublishing keeps it.
    pub fn published_at(
        &self,
        current: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        match self {
            Self::Published => current.or(Some(now)),
            Self::Draft => current,
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(format!("unknown post status `{}`", other)),
        }
    }
}

/// A `posts` row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub status: PostStatus,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub views: u64,
    pub author_id: String,
    pub published_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl PostRecord {
    pub fn is_public(&self) -> bool {
        self.status == PostStatus::Published && self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    /// Number of published posts; only filled by category listings.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// A post as handed to callers, with its links flattened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub record: PostRecord,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub author: Option<Profile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    pub id: String,
    pub text: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub last_page: u64,
}

impl PageMeta {
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        let last_page = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            total,
            page,
            limit,
            last_page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn empty(page: u64, limit: u64) -> Self {
        Self {
            data: Vec::new(),
            meta: PageMeta::new(0, page, limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn publishing_stamps_first_publish_time_only() {
        assert_eq!(PostStatus::Published.published_at(None, at(2)), Some(at(2)));
        assert_eq!(
            PostStatus::Published.published_at(Some(at(1)), at(2)),
            Some(at(1))
        );
    }

    #[test]
    fn unpublishing_keeps_publish_time() {
        assert_eq!(PostStatus::Draft.published_at(Some(at(1)), at(5)), Some(at(1)));
        assert_eq!(PostStatus::Draft.published_at(None, at(5)), None);
    }

    #[test]
    fn last_page_rounds_up() {
        assert_eq!(PageMeta::new(21, 1, 10).last_page, 3);
        assert_eq!(PageMeta::new(20, 1, 10).last_page, 2);
        assert_eq!(PageMeta::new(0, 1, 10).last_page, 0);
    }

    #[test]
    fn status_parses_from_lowercase() {
        assert_eq!("draft".parse::<PostStatus>(), Ok(PostStatus::Draft));
        assert!("archived".parse::<PostStatus>().is_err());
    }
}
