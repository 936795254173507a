//! The one mapping from store join rows to the entities callers see.

use crate::models::{Category, Post};
use crate::store::{CategoryCountRow, PostJoinRow};

/// Drops links whose target row is gone, keeping link order.
pub fn flatten(row: PostJoinRow) -> Post {
    Post {
        record: row.post,
        categories: row.categories.into_iter().flatten().collect(),
        tags: row.tags.into_iter().flatten().collect(),
        author: row.author,
    }
}

pub fn counted_category(row: CategoryCountRow) -> Category {
    Category {
        post_count: Some(row.post_count),
        ..row.category
    }
}
