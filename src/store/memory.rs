use crate::error::StoreError;
use crate::models::{Category, CategoryId, PostId, PostRecord, PostStatus, Profile, Tag, TagId};
use crate::params::{PostSort, SortDirection};
use crate::store::{
    Audience, CategoryCountRow, CategoryWrite, ContentStore, PostFilter, PostJoinRow, PostKey,
    PostWrite, RowSet, SlugTable, TagWrite,
};
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

#[derive(Default)]
struct Tables {
    posts: Vec<PostRecord>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    post_categories: Vec<(PostId, CategoryId)>,
    post_tags: Vec<(PostId, TagId)>,
    profiles: Vec<Profile>,
    last_ids: [u64; 3],
}

impl Tables {
    /// Per-table auto increment.
    fn next_id(&mut self, table: SlugTable) -> u64 {
        let slot = match table {
            SlugTable::Posts => 0,
            SlugTable::Categories => 1,
            SlugTable::Tags => 2,
        };
        self.last_ids[slot] += 1;
        self.last_ids[slot]
    }

    fn visible(post: &PostRecord, audience: Audience) -> bool {
        post.deleted_at.is_none()
            && (audience == Audience::Dashboard || post.status == PostStatus::Published)
    }

    /// Link rows are kept when their target is deleted, which surfaces as
    /// `None` here just like a `LEFT JOIN`.
    fn join(&self, post: &PostRecord) -> PostJoinRow {
        let mut category_links: Vec<CategoryId> = self
            .post_categories
            .iter()
            .filter(|(post_id, _)| *post_id == post.id)
            .map(|(_, category_id)| *category_id)
            .collect();
        category_links.sort_unstable();

        let mut tag_links: Vec<TagId> = self
            .post_tags
            .iter()
            .filter(|(post_id, _)| *post_id == post.id)
            .map(|(_, tag_id)| *tag_id)
            .collect();
        tag_links.sort_unstable();

        PostJoinRow {
            post: post.clone(),
            categories: category_links
                .into_iter()
                .map(|id| self.categories.iter().find(|c| c.id == id).cloned())
                .collect(),
            tags: tag_links
                .into_iter()
                .map(|id| self.tags.iter().find(|t| t.id == id).cloned())
                .collect(),
            author: self
                .profiles
                .iter()
                .find(|p| p.id == post.author_id)
                .cloned(),
        }
    }
}

fn matches_search(post: &PostRecord, term: &str) -> bool {
    let term = term.to_lowercase();
    post.title.to_lowercase().contains(&term)
        || post
            .excerpt
            .as_deref()
            .is_some_and(|excerpt| excerpt.to_lowercase().contains(&term))
}

fn compare(a: &PostRecord, b: &PostRecord, sort: PostSort) -> Ordering {
    let primary = match sort {
        // NULL sorts first ascending, as in MySQL.
        PostSort::PublishedAt => a.published_at.cmp(&b.published_at),
        PostSort::CreatedAt => a.created_at.cmp(&b.created_at),
        PostSort::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        PostSort::Title => a.title.cmp(&b.title),
        PostSort::Views => a.views.cmp(&b.views),
    };
    primary.then(a.id.cmp(&b.id))
}

/// In-process store with the same visibility and join semantics as
/// [`crate::store::MySqlStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    post_selects: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, profile: Profile) {
        self.tables.write().profiles.push(profile);
    }

    /// How many times the posts table itself was queried.
    pub fn post_selects(&self) -> usize {
        self.post_selects.load(AtomicOrdering::SeqCst)
    }

    fn post_ids_where<F>(links: &[(PostId, u64)], keep: F) -> Vec<PostId>
    where
        F: Fn(u64) -> bool,
    {
        links
            .iter()
            .filter(|(_, target)| keep(*target))
            .map(|(post_id, _)| *post_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl ContentStore for MemoryStore {
    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn post_ids_in_category(&self, category_slug: &str) -> Result<Vec<PostId>, StoreError> {
        let tables = self.tables.read();
        let Some(category) = tables.categories.iter().find(|c| c.slug == category_slug) else {
            return Ok(Vec::new());
        };
        Ok(Self::post_ids_where(&tables.post_categories, |id| {
            id == category.id
        }))
    }

    fn post_ids_with_tag(&self, tag_slug: &str) -> Result<Vec<PostId>, StoreError> {
        let tables = self.tables.read();
        let Some(tag) = tables.tags.iter().find(|t| t.slug == tag_slug) else {
            return Ok(Vec::new());
        };
        Ok(Self::post_ids_where(&tables.post_tags, |id| id == tag.id))
    }

    fn post_ids_in_categories(&self, ids: &[CategoryId]) -> Result<Vec<PostId>, StoreError> {
        let tables = self.tables.read();
        Ok(Self::post_ids_where(&tables.post_categories, |id| {
            ids.contains(&id)
        }))
    }

    fn select_posts(&self, filter: &PostFilter) -> Result<RowSet, StoreError> {
        self.post_selects.fetch_add(1, AtomicOrdering::SeqCst);
        let tables = self.tables.read();

        let mut matched: Vec<&PostRecord> = tables
            .posts
            .iter()
            .filter(|p| Tables::visible(p, filter.audience))
            .filter(|p| filter.ids.as_ref().map_or(true, |ids| ids.contains(&p.id)))
            .filter(|p| filter.exclude != Some(p.id))
            .filter(|p| {
                filter
                    .search
                    .as_deref()
                    .map_or(true, |term| matches_search(p, term))
            })
            .collect();

        matched.sort_by(|a, b| {
            let ordering = compare(a, b, filter.sort);
            match filter.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matched.len() as u64;
        let page: Vec<&PostRecord> = match filter.window {
            Some(window) => matched
                .into_iter()
                .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
                .collect(),
            None => matched,
        };

        Ok(RowSet {
            rows: page.into_iter().map(|p| tables.join(p)).collect(),
            total,
        })
    }

    fn select_post(
        &self,
        key: PostKey<'_>,
        audience: Audience,
    ) -> Result<Option<PostJoinRow>, StoreError> {
        self.post_selects.fetch_add(1, AtomicOrdering::SeqCst);
        let tables = self.tables.read();
        Ok(tables
            .posts
            .iter()
            .filter(|p| Tables::visible(p, audience))
            .find(|p| match key {
                PostKey::Slug(slug) => p.slug == slug,
                PostKey::Id(id) => p.id == id,
            })
            .map(|p| tables.join(p)))
    }

    fn slug_taken(
        &self,
        table: SlugTable,
        slug: &str,
        except: Option<u64>,
    ) -> Result<bool, StoreError> {
        let tables = self.tables.read();
        let other = |id: u64| except != Some(id);
        Ok(match table {
            SlugTable::Posts => tables.posts.iter().any(|p| p.slug == slug && other(p.id)),
            SlugTable::Categories => tables
                .categories
                .iter()
                .any(|c| c.slug == slug && other(c.id)),
            SlugTable::Tags => tables.tags.iter().any(|t| t.slug == slug && other(t.id)),
        })
    }

    fn increment_views(&self, slug: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if let Some(post) = tables
            .posts
            .iter_mut()
            .find(|p| p.slug == slug && p.deleted_at.is_none())
        {
            post.views += 1;
        }
        Ok(())
    }

    fn insert_post(&self, post: &PostWrite, author_id: &str) -> Result<PostId, StoreError> {
        let mut tables = self.tables.write();
        let id = tables.next_id(SlugTable::Posts);
        tables.posts.push(PostRecord {
            id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            thumbnail: post.thumbnail.clone(),
            status: post.status,
            seo_title: post.seo_title.clone(),
            seo_description: post.seo_description.clone(),
            views: 0,
            author_id: author_id.to_string(),
            published_at: post.published_at,
            created_at: post.at,
            updated_at: post.at,
            deleted_at: None,
        });
        Ok(id)
    }

    fn update_post(&self, id: PostId, post: &PostWrite) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let Some(record) = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
        else {
            return Ok(false);
        };
        record.slug = post.slug.clone();
        record.title = post.title.clone();
        record.excerpt = post.excerpt.clone();
        record.content = post.content.clone();
        record.thumbnail = post.thumbnail.clone();
        record.status = post.status;
        record.seo_title = post.seo_title.clone();
        record.seo_description = post.seo_description.clone();
        record.published_at = post.published_at;
        record.updated_at = post.at;
        Ok(true)
    }

    fn soft_delete_post(&self, id: PostId, at: NaiveDateTime) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        match tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
        {
            Some(record) => {
                record.deleted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn replace_post_links(
        &self,
        post_id: PostId,
        category_ids: &[CategoryId],
        tag_ids: &[TagId],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.post_categories.retain(|(id, _)| *id != post_id);
        tables
            .post_categories
            .extend(category_ids.iter().map(|c| (post_id, *c)));
        tables.post_tags.retain(|(id, _)| *id != post_id);
        tables.post_tags.extend(tag_ids.iter().map(|t| (post_id, *t)));
        Ok(())
    }

    fn list_categories(&self) -> Result<Vec<CategoryCountRow>, StoreError> {
        let tables = self.tables.read();
        let mut rows: Vec<CategoryCountRow> = tables
            .categories
            .iter()
            .map(|category| {
                let post_count = tables
                    .post_categories
                    .iter()
                    .filter(|(_, c)| *c == category.id)
                    .filter(|(post_id, _)| {
                        tables
                            .posts
                            .iter()
                            .any(|p| p.id == *post_id && p.is_public())
                    })
                    .count() as u64;
                CategoryCountRow {
                    category: category.clone(),
                    post_count,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(rows)
    }

    fn find_category(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let tables = self.tables.read();
        Ok(tables.categories.iter().find(|c| c.slug == slug).cloned())
    }

    fn insert_category(&self, category: &CategoryWrite) -> Result<CategoryId, StoreError> {
        let mut tables = self.tables.write();
        let id = tables.next_id(SlugTable::Categories);
        tables.categories.push(Category {
            id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            color: category.color.clone(),
            post_count: None,
        });
        Ok(id)
    }

    fn update_category(
        &self,
        id: CategoryId,
        category: &CategoryWrite,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let Some(record) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        record.name = category.name.clone();
        record.slug = category.slug.clone();
        record.description = category.description.clone();
        record.color = category.color.clone();
        Ok(true)
    }

    fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() < before)
    }

    fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let tables = self.tables.read();
        let mut tags = tables.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn find_tag(&self, slug: &str) -> Result<Option<Tag>, StoreError> {
        let tables = self.tables.read();
        Ok(tables.tags.iter().find(|t| t.slug == slug).cloned())
    }

    fn insert_tag(&self, tag: &TagWrite) -> Result<TagId, StoreError> {
        let mut tables = self.tables.write();
        let id = tables.next_id(SlugTable::Tags);
        tables.tags.push(Tag {
            id,
            name: tag.name.clone(),
            slug: tag.slug.clone(),
        });
        Ok(id)
    }

    fn update_tag(&self, id: TagId, tag: &TagWrite) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let Some(record) = tables.tags.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        record.name = tag.name.clone();
        record.slug = tag.slug.clone();
        Ok(true)
    }

    fn delete_tag(&self, id: TagId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let before = tables.tags.len();
        tables.tags.retain(|t| t.id != id);
        Ok(tables.tags.len() < before)
    }

    fn find_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let tables = self.tables.read();
        Ok(tables.profiles.iter().find(|p| p.id == id).cloned())
    }
}
