use crate::error::{QueryContext, Result};
use crate::models::{CategoryId, Paginated, PageMeta, Post, PostId};
use crate::params::{non_blank, PostListParams};
use crate::queries::transform::flatten;
use crate::store::{Audience, ContentStore, PostFilter, PostKey, Window};

pub const DEFAULT_RELATED_LIMIT: u64 = 3;

pub fn get_post_by_slug(store: &dyn ContentStore, slug: &str) -> Result<Option<Post>> {
    tracing::debug!("get_post_by_slug started: {}", slug);
    let row = store
        .select_post(PostKey::Slug(slug), Audience::Public)
        .context("Failed to fetch post")?;
    Ok(row.map(flatten))
}

/// Every published post, optionally narrowed by search text and category.
pub fn get_posts(
    store: &dyn ContentStore,
    search: Option<&str>,
    category_slug: Option<&str>,
) -> Result<Vec<Post>> {
    tracing::debug!("get_posts started");
    let mut filter = PostFilter::new(Audience::Public);
    filter.search = non_blank(search).map(str::to_string);

    if let Some(slug) = non_blank(category_slug) {
        let ids = store
            .post_ids_in_category(slug)
            .context("Failed to fetch posts by category")?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        filter.ids = Some(ids);
    }

    let found = store.select_posts(&filter).context("Failed to fetch posts")?;
    Ok(found.rows.into_iter().map(flatten).collect())
}

pub fn get_paginated_posts(
    store: &dyn ContentStore,
    params: &PostListParams,
) -> Result<Paginated<Post>> {
    tracing::debug!("get_paginated_posts started");
    paginate(store, params, Audience::Public)
}

/// Dashboard listing: drafts included, soft-deleted posts still hidden.
pub fn list_dashboard_posts(
    store: &dyn ContentStore,
    params: &PostListParams,
) -> Result<Paginated<Post>> {
    tracing::debug!("list_dashboard_posts started");
    paginate(store, params, Audience::Dashboard)
}

fn paginate(
    store: &dyn ContentStore,
    params: &PostListParams,
    audience: Audience,
) -> Result<Paginated<Post>> {
    let (page, limit) = (params.page(), params.limit());

    let ids = candidate_ids(store, params)?;
    if ids.as_ref().is_some_and(Vec::is_empty) {
        tracing::debug!("no post matches both category and tag filters");
        return Ok(Paginated::empty(page, limit));
    }

    let filter = PostFilter {
        ids,
        search: params.search().map(str::to_string),
        sort: params.sort(),
        direction: params.order(),
        window: Some(Window {
            offset: params.offset(),
            limit,
        }),
        ..PostFilter::new(audience)
    };

    let found = store
        .select_posts(&filter)
        .context("Failed to fetch paginated posts")?;

    Ok(Paginated {
        data: found.rows.into_iter().map(flatten).collect(),
        meta: PageMeta::new(found.total, page, limit),
    })
}

/// `None` when neither a category nor a tag filter was given. With both, the
/// two id sets are resolved separately and intersected.
fn candidate_ids(
    store: &dyn ContentStore,
    params: &PostListParams,
) -> Result<Option<Vec<PostId>>> {
    let by_category = match params.category() {
        Some(slug) => Some(
            store
                .post_ids_in_category(slug)
                .context("Failed to fetch posts by category")?,
        ),
        None => None,
    };
    let by_tag = match params.tag() {
        Some(slug) => Some(
            store
                .post_ids_with_tag(slug)
                .context("Failed to fetch posts by tag")?,
        ),
        None => None,
    };

    Ok(match (by_category, by_tag) {
        (Some(categories), Some(tags)) => Some(
            categories
                .into_iter()
                .filter(|id| tags.contains(id))
                .collect(),
        ),
        (ids @ Some(_), None) | (None, ids @ Some(_)) => ids,
        (None, None) => None,
    })
}

/// Latest published posts sharing a category with `post_id`, excluding it.
pub fn get_related_posts(
    store: &dyn ContentStore,
    post_id: PostId,
    category_ids: &[CategoryId],
    limit: u64,
) -> Result<Vec<Post>> {
    tracing::debug!("get_related_posts started: {}", post_id);
    if category_ids.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let ids: Vec<PostId> = store
        .post_ids_in_categories(category_ids)
        .context("Failed to fetch related posts")?
        .into_iter()
        .filter(|id| *id != post_id)
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let filter = PostFilter {
        ids: Some(ids),
        exclude: Some(post_id),
        window: Some(Window { offset: 0, limit }),
        ..PostFilter::new(Audience::Public)
    };
    let found = store
        .select_posts(&filter)
        .context("Failed to fetch related posts")?;
    Ok(found.rows.into_iter().map(flatten).collect())
}

/// Counts a view. Failures are logged and never reach the caller.
pub fn increment_view(store: &dyn ContentStore, slug: &str) {
    if let Err(e) = store.increment_views(slug) {
        tracing::warn!("increment_view failed: {}", e);
    }
}
