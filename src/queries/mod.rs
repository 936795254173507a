//! Read and write operations over a [`ContentStore`](crate::store::ContentStore).
//!
//! Every function takes the store handle explicitly. Store failures come
//! back as [`Error::Query`](crate::error::Error::Query) with a short prefix
//! naming the operation; missing rows are `None` or an empty list.

pub mod dashboard;
pub mod posts;
pub mod taxonomy;
pub mod transform;

pub use dashboard::{create_post, delete_post, update_post};
pub use posts::{
    get_paginated_posts, get_post_by_slug, get_posts, get_related_posts, increment_view,
    list_dashboard_posts, DEFAULT_RELATED_LIMIT,
};
pub use taxonomy::{
    create_category, create_tag, delete_category, delete_tag, get_categories,
    get_category_by_slug, get_tag_by_slug, get_tags, update_category, update_tag,
};

use crate::error::{QueryContext, Result};
use crate::models::Profile;
use crate::store::ContentStore;

pub fn get_profile(store: &dyn ContentStore, id: &str) -> Result<Option<Profile>> {
    store.find_profile(id).context("Failed to fetch profile")
}
