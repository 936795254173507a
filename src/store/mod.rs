//! The seam between the query layer and the relational store.

pub mod memory;
pub mod mysql;

pub use self::memory::MemoryStore;
pub use self::mysql::MySqlStore;

use crate::error::StoreError;
use crate::models::{Category, CategoryId, PostId, PostRecord, PostStatus, Profile, Tag, TagId};
use crate::params::{PostSort, SortDirection};
use chrono::NaiveDateTime;

/// Which posts a read may see. Soft-deleted posts are never visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Published posts only.
    Public,
    /// Drafts and published posts.
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKey<'a> {
    Slug(&'a str),
    Id(PostId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugTable {
    Posts,
    Categories,
    Tags,
}

impl SlugTable {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Categories => "categories",
            Self::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub audience: Audience,
    /// Restricts the selection to these posts.
    pub ids: Option<Vec<PostId>>,
    pub exclude: Option<PostId>,
    /// Case-insensitive substring of title or excerpt.
    pub search: Option<String>,
    pub sort: PostSort,
    pub direction: SortDirection,
    pub window: Option<Window>,
}

impl PostFilter {
    pub fn new(audience: Audience) -> Self {
        Self {
            audience,
            ids: None,
            exclude: None,
            search: None,
            sort: PostSort::default(),
            direction: SortDirection::default(),
            window: None,
        }
    }
}

/// A post with its link-table joins as the store returns them. A `None`
/// entry is a link whose target row no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct PostJoinRow {
    pub post: PostRecord,
    pub categories: Vec<Option<Category>>,
    pub tags: Vec<Option<Tag>>,
    pub author: Option<Profile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub rows: Vec<PostJoinRow>,
    /// Matches before the window was applied.
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCountRow {
    pub category: Category,
    pub post_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostWrite {
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub status: PostStatus,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub published_at: Option<NaiveDateTime>,
    /// Written to `updated_at`, and to `created_at` on insert.
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryWrite {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagWrite {
    pub name: String,
    pub slug: String,
}

pub trait ContentStore: Send + Sync {
    fn ping(&self) -> Result<(), StoreError>;

    fn post_ids_in_category(&self, category_slug: &str) -> Result<Vec<PostId>, StoreError>;
    fn post_ids_with_tag(&self, tag_slug: &str) -> Result<Vec<PostId>, StoreError>;
    fn post_ids_in_categories(&self, ids: &[CategoryId]) -> Result<Vec<PostId>, StoreError>;

    fn select_posts(&self, filter: &PostFilter) -> Result<RowSet, StoreError>;
    fn select_post(
        &self,
        key: PostKey<'_>,
        audience: Audience,
    ) -> Result<Option<PostJoinRow>, StoreError>;

    /// Includes soft-deleted posts, which still hold their slug.
    fn slug_taken(
        &self,
        table: SlugTable,
        slug: &str,
        except: Option<u64>,
    ) -> Result<bool, StoreError>;

    fn increment_views(&self, slug: &str) -> Result<(), StoreError>;

    fn insert_post(&self, post: &PostWrite, author_id: &str) -> Result<PostId, StoreError>;
    fn update_post(&self, id: PostId, post: &PostWrite) -> Result<bool, StoreError>;
    fn soft_delete_post(&self, id: PostId, at: NaiveDateTime) -> Result<bool, StoreError>;
    /// Drops every link of the post, then links the given rows.
    fn replace_post_links(
        &self,
        post_id: PostId,
        category_ids: &[CategoryId],
        tag_ids: &[TagId],
    ) -> Result<(), StoreError>;

    fn list_categories(&self) -> Result<Vec<CategoryCountRow>, StoreError>;
    fn find_category(&self, slug: &str) -> Result<Option<Category>, StoreError>;
    fn insert_category(&self, category: &CategoryWrite) -> Result<CategoryId, StoreError>;
    fn update_category(&self, id: CategoryId, category: &CategoryWrite)
        -> Result<bool, StoreError>;
    fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError>;

    fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;
    fn find_tag(&self, slug: &str) -> Result<Option<Tag>, StoreError>;
    fn insert_tag(&self, tag: &TagWrite) -> Result<TagId, StoreError>;
    fn update_tag(&self, id: TagId, tag: &TagWrite) -> Result<bool, StoreError>;
    fn delete_tag(&self, id: TagId) -> Result<bool, StoreError>;

    fn find_profile(&self, id: &str) -> Result<Option<Profile>, StoreError>;
}
