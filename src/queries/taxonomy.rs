//! Categories and tags. Both are hard-deleted; link rows pointing at a
//! removed row are left for the join transform to drop.

use crate::error::{QueryContext, Result};
use crate::models::{Category, CategoryId, Tag, TagId};
use crate::queries::transform::counted_category;
use crate::store::{ContentStore, SlugTable};
use crate::validation::{CategoryInput, FieldErrors, Submission, TagInput};

/// All categories with their published post counts, by name.
pub fn get_categories(store: &dyn ContentStore) -> Result<Vec<Category>> {
    tracing::debug!("get_categories started");
    let rows = store
        .list_categories()
        .context("Failed to fetch categories")?;
    Ok(rows.into_iter().map(counted_category).collect())
}

pub fn get_category_by_slug(store: &dyn ContentStore, slug: &str) -> Result<Option<Category>> {
    store
        .find_category(slug)
        .context("Failed to fetch category")
}

fn check_unique(
    store: &dyn ContentStore,
    table: SlugTable,
    slug: &str,
    except: Option<u64>,
    errors: &mut FieldErrors,
) -> Result<()> {
    if errors.has("slug") {
        return Ok(());
    }
    let taken = store
        .slug_taken(table, slug, except)
        .context("Failed to check slug")?;
    if taken {
        errors.push("slug", "slug is already in use");
    }
    Ok(())
}

pub fn create_category(
    store: &dyn ContentStore,
    input: &CategoryInput,
) -> Result<Submission<Category>> {
    tracing::info!("create_category started");
    let slug = input.slug();
    let mut errors = input.check();
    check_unique(store, SlugTable::Categories, &slug, None, &mut errors)?;
    if !errors.is_empty() {
        return Ok(Submission::Rejected(errors));
    }

    let write = input.to_write(slug);
    let id = store
        .insert_category(&write)
        .context("Failed to create category")?;
    Ok(Submission::Saved(Category {
        id,
        name: write.name,
        slug: write.slug,
        description: write.description,
        color: write.color,
        post_count: None,
    }))
}

pub fn update_category(
    store: &dyn ContentStore,
    id: CategoryId,
    input: &CategoryInput,
) -> Result<Option<Submission<Category>>> {
    tracing::info!("update_category started: {}", id);
    let slug = input.slug();
    let mut errors = input.check();
    check_unique(store, SlugTable::Categories, &slug, Some(id), &mut errors)?;
    if !errors.is_empty() {
        return Ok(Some(Submission::Rejected(errors)));
    }

    let write = input.to_write(slug);
    let found = store
        .update_category(id, &write)
        .context("Failed to update category")?;
    Ok(found.then(|| {
        Submission::Saved(Category {
            id,
            name: write.name,
            slug: write.slug,
            description: write.description,
            color: write.color,
            post_count: None,
        })
    }))
}

pub fn delete_category(store: &dyn ContentStore, id: CategoryId) -> Result<bool> {
    tracing::info!("delete_category started: {}", id);
    store
        .delete_category(id)
        .context("Failed to delete category")
}

pub fn get_tags(store: &dyn ContentStore) -> Result<Vec<Tag>> {
    tracing::debug!("get_tags started");
    store.list_tags().context("Failed to fetch tags")
}

pub fn get_tag_by_slug(store: &dyn ContentStore, slug: &str) -> Result<Option<Tag>> {
    store.find_tag(slug).context("Failed to fetch tag")
}

pub fn create_tag(store: &dyn ContentStore, input: &TagInput) -> Result<Submission<Tag>> {
    tracing::info!("create_tag started");
    let slug = input.slug();
    let mut errors = input.check();
    check_unique(store, SlugTable::Tags, &slug, None, &mut errors)?;
    if !errors.is_empty() {
        return Ok(Submission::Rejected(errors));
    }

    let write = input.to_write(slug);
    let id = store.insert_tag(&write).context("Failed to create tag")?;
    Ok(Submission::Saved(Tag {
        id,
        name: write.name,
        slug: write.slug,
    }))
}

pub fn update_tag(
    store: &dyn ContentStore,
    id: TagId,
    input: &TagInput,
) -> Result<Option<Submission<Tag>>> {
    tracing::info!("update_tag started: {}", id);
    let slug = input.slug();
    let mut errors = input.check();
    check_unique(store, SlugTable::Tags, &slug, Some(id), &mut errors)?;
    if !errors.is_empty() {
        return Ok(Some(Submission::Rejected(errors)));
    }

    let write = input.to_write(slug);
    let found = store
        .update_tag(id, &write)
        .context("Failed to update tag")?;
    Ok(found.then(|| {
        Submission::Saved(Tag {
            id,
            name: write.name,
            slug: write.slug,
        })
    }))
}

pub fn delete_tag(store: &dyn ContentStore, id: TagId) -> Result<bool> {
    tracing::info!("delete_tag started: {}", id);
    store.delete_tag(id).context("Failed to delete tag")
}
