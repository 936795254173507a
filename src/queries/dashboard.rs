use crate::error::{Error, QueryContext, Result, StoreError};
use crate::models::{Post, PostId};
use crate::queries::transform::flatten;
use crate::store::{Audience, ContentStore, PostKey, SlugTable};
use crate::validation::{FieldErrors, PostInput, Submission};
use chrono::NaiveDateTime;

pub fn create_post(
    store: &dyn ContentStore,
    input: &PostInput,
    author_id: &str,
    now: NaiveDateTime,
) -> Result<Submission<Post>> {
    tracing::info!("create_post started");
    let slug = input.slug();
    let errors = check_post(store, input, &slug, None)?;
    if !errors.is_empty() {
        return Ok(Submission::Rejected(errors));
    }

    let status = input.status();
    let write = input.to_write(slug, status.published_at(None, now), now);
    let id = store
        .insert_post(&write, author_id)
        .context("Failed to create post")?;
    store
        .replace_post_links(id, &input.category_ids(), &input.tag_ids())
        .context("Failed to link post")?;

    tracing::info!("create_post saved post {}", id);
    reload(store, id).map(Submission::Saved)
}

/// `None` when the post does not exist or was deleted.
pub fn update_post(
    store: &dyn ContentStore,
    id: PostId,
    input: &PostInput,
    now: NaiveDateTime,
) -> Result<Option<Submission<Post>>> {
    tracing::info!("update_post started: {}", id);
    let Some(current) = store
        .select_post(PostKey::Id(id), Audience::Dashboard)
        .context("Failed to fetch post")?
    else {
        return Ok(None);
    };

    let slug = input.slug();
    let errors = check_post(store, input, &slug, Some(id))?;
    if !errors.is_empty() {
        return Ok(Some(Submission::Rejected(errors)));
    }

    let published_at = input.status().published_at(current.post.published_at, now);
    let write = input.to_write(slug, published_at, now);
    if !store
        .update_post(id, &write)
        .context("Failed to update post")?
    {
        return Ok(None);
    }
    store
        .replace_post_links(id, &input.category_ids(), &input.tag_ids())
        .context("Failed to link post")?;

    reload(store, id).map(|post| Some(Submission::Saved(post)))
}

/// Soft delete. Returns whether a live post was found.
pub fn delete_post(store: &dyn ContentStore, id: PostId, now: NaiveDateTime) -> Result<bool> {
    tracing::info!("delete_post started: {}", id);
    store
        .soft_delete_post(id, now)
        .context("Failed to delete post")
}

fn check_post(
    store: &dyn ContentStore,
    input: &PostInput,
    slug: &str,
    except: Option<PostId>,
) -> Result<FieldErrors> {
    let mut errors = input.check();

    if !errors.has("slug")
        && store
            .slug_taken(SlugTable::Posts, slug, except)
            .context("Failed to check post slug")?
    {
        errors.push("slug", "slug is already in use");
    }

    let category_ids = input.category_ids();
    if !category_ids.is_empty() {
        let known: Vec<_> = store
            .list_categories()
            .context("Failed to fetch categories")?
            .into_iter()
            .map(|row| row.category.id)
            .collect();
        for id in category_ids.iter().filter(|id| !known.contains(*id)) {
            errors.push("category_ids", format!("category {} does not exist", id));
        }
    }

    let tag_ids = input.tag_ids();
    if !tag_ids.is_empty() {
        let known: Vec<_> = store
            .list_tags()
            .context("Failed to fetch tags")?
            .into_iter()
            .map(|tag| tag.id)
            .collect();
        for id in tag_ids.iter().filter(|id| !known.contains(*id)) {
            errors.push("tag_ids", format!("tag {} does not exist", id));
        }
    }

    Ok(errors)
}

fn reload(store: &dyn ContentStore, id: PostId) -> Result<Post> {
    store
        .select_post(PostKey::Id(id), Audience::Dashboard)
        .context("Failed to fetch saved post")?
        .map(flatten)
        .ok_or(Error::Query {
            context: "Failed to fetch saved post",
            source: StoreError::Vanished { table: "posts", id },
        })
}
