use chrono::{NaiveDate, NaiveDateTime};
use personal_site::error::StoreError;
use personal_site::models::{
    Category, CategoryId, PostId, PostStatus, Profile, Tag, TagId,
};
use personal_site::params::{PostListParams, SortDirection, MAX_PAGE_SIZE};
use personal_site::queries;
use personal_site::store::{
    Audience, CategoryCountRow, CategoryWrite, ContentStore, MemoryStore, PostFilter,
    PostJoinRow, PostKey, PostWrite, RowSet, SlugTable, TagWrite,
};
use personal_site::validation::{CategoryInput, PostInput, Submission, TagInput};

const AUTHOR: &str = "author-1";

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn write(slug: &str, status: PostStatus, day: u32) -> PostWrite {
    PostWrite {
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        excerpt: None,
        content: Some(format!("<p>{}</p>", slug)),
        thumbnail: None,
        status,
        seo_title: None,
        seo_description: None,
        published_at: (status == PostStatus::Published).then(|| at(day)),
        at: at(day),
    }
}

fn published(store: &MemoryStore, slug: &str, day: u32) -> PostId {
    store
        .insert_post(&write(slug, PostStatus::Published, day), AUTHOR)
        .unwrap()
}

fn category(store: &MemoryStore, slug: &str) -> CategoryId {
    store
        .insert_category(&CategoryWrite {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            description: None,
            color: None,
        })
        .unwrap()
}

fn tag(store: &MemoryStore, slug: &str) -> TagId {
    store
        .insert_tag(&TagWrite {
            name: slug.to_string(),
            slug: slug.to_string(),
        })
        .unwrap()
}

fn slugs<'a>(posts: impl IntoIterator<Item = &'a personal_site::models::Post>) -> Vec<&'a str> {
    posts.into_iter().map(|p| p.record.slug.as_str()).collect()
}

fn filtered(category: Option<&str>, tag: Option<&str>) -> PostListParams {
    PostListParams {
        category: category.map(str::to_string),
        tag: tag.map(str::to_string),
        ..Default::default()
    }
}

#[test]
fn category_and_tag_filters_are_intersected() {
    let store = MemoryStore::new();
    let ids: Vec<PostId> = (1..=5)
        .map(|n| published(&store, &format!("post-{}", n), n))
        .collect();
    let rust = category(&store, "rust");
    let axum = tag(&store, "axum");

    for id in &ids[0..3] {
        let tags = if *id == ids[2] { vec![axum] } else { Vec::new() };
        store.replace_post_links(*id, &[rust], &tags).unwrap();
    }
    for id in &ids[3..5] {
        store.replace_post_links(*id, &[], &[axum]).unwrap();
    }

    let page =
        queries::get_paginated_posts(&store, &filtered(Some("rust"), Some("axum"))).unwrap();
    assert_eq!(slugs(&page.data), vec!["post-3"]);
    assert_eq!(page.data[0].record.id, ids[2]);
    assert_eq!((page.meta.total, page.meta.last_page), (1, 1));
}

#[test]
fn empty_intersection_skips_the_main_query() {
    let store = MemoryStore::new();
    let first = published(&store, "first", 1);
    let second = published(&store, "second", 2);
    let rust = category(&store, "rust");
    let axum = tag(&store, "axum");
    store.replace_post_links(first, &[rust], &[]).unwrap();
    store.replace_post_links(second, &[], &[axum]).unwrap();

    let page =
        queries::get_paginated_posts(&store, &filtered(Some("rust"), Some("axum"))).unwrap();
    assert!(page.data.is_empty());
    assert_eq!((page.meta.total, page.meta.last_page), (0, 0));
    assert_eq!(store.post_selects(), 0);

    let page = queries::get_paginated_posts(&store, &filtered(Some("missing"), None)).unwrap();
    assert!(page.data.is_empty());
    assert_eq!(store.post_selects(), 0);
}

#[test]
fn links_to_deleted_categories_are_dropped() {
    let store = MemoryStore::new();
    let id = published(&store, "orphaned", 1);
    let gone = category(&store, "gone");
    let go = tag(&store, "go");
    store.replace_post_links(id, &[gone], &[go]).unwrap();

    assert!(queries::delete_category(&store, gone).unwrap());
    assert!(queries::delete_tag(&store, go).unwrap());

    let post = queries::get_post_by_slug(&store, "orphaned")
        .unwrap()
        .unwrap();
    assert!(post.categories.is_empty());
    assert!(post.tags.is_empty());

    let json = serde_json::to_value(&post).unwrap();
    assert_eq!(json["categories"], serde_json::json!([]));
    assert_eq!(json["tags"], serde_json::json!([]));
}

#[test]
fn public_reads_never_return_drafts_or_deleted_posts() {
    let store = MemoryStore::new();
    published(&store, "live", 1);
    store
        .insert_post(&write("draft", PostStatus::Draft, 2), AUTHOR)
        .unwrap();
    let removed = published(&store, "removed", 3);
    store.soft_delete_post(removed, at(4)).unwrap();

    let page = queries::get_paginated_posts(&store, &PostListParams::default()).unwrap();
    assert_eq!(slugs(&page.data), vec!["live"]);
    assert_eq!(page.meta.total, 1);

    assert_eq!(slugs(&queries::get_posts(&store, None, None).unwrap()), vec!["live"]);
    assert!(queries::get_post_by_slug(&store, "draft").unwrap().is_none());
    assert!(queries::get_post_by_slug(&store, "removed").unwrap().is_none());

    let dashboard = queries::list_dashboard_posts(&store, &PostListParams::default()).unwrap();
    assert_eq!(slugs(&dashboard.data), vec!["live", "draft"]);
}

#[test]
fn search_sort_and_pages() {
    let store = MemoryStore::new();
    published(&store, "rust-tips", 1);
    published(&store, "axum-routing", 2);
    let mut with_excerpt = write("misc-notes", PostStatus::Published, 3);
    with_excerpt.excerpt = Some("Some RUST internals".to_string());
    store.insert_post(&with_excerpt, AUTHOR).unwrap();

    let params = PostListParams {
        search: Some("Rust".to_string()),
        ..Default::default()
    };
    let page = queries::get_paginated_posts(&store, &params).unwrap();
    assert_eq!(slugs(&page.data), vec!["misc-notes", "rust-tips"]);

    let params = PostListParams {
        sort: Some("title".to_string()),
        order: Some(SortDirection::Asc),
        limit: Some(2),
        page: Some(2),
        ..Default::default()
    };
    let page = queries::get_paginated_posts(&store, &params).unwrap();
    assert_eq!(slugs(&page.data), vec!["rust-tips"]);
    assert_eq!((page.meta.total, page.meta.page, page.meta.last_page), (3, 2, 2));

    let all = queries::get_posts(&store, Some("  axum "), None).unwrap();
    assert_eq!(slugs(&all), vec!["axum-routing"]);
}

#[test]
fn pages_past_the_end_are_empty() {
    let store = MemoryStore::new();
    published(&store, "rust-tips", 1);

    let params = PostListParams {
        page: Some(u64::MAX),
        limit: Some(MAX_PAGE_SIZE),
        ..Default::default()
    };
    let page = queries::get_paginated_posts(&store, &params).unwrap();
    assert!(page.data.is_empty());
    assert_eq!((page.meta.total, page.meta.page), (1, u64::MAX));
}

#[test]
fn related_posts_share_a_category_and_skip_the_source() {
    let store = MemoryStore::new();
    let source = published(&store, "source", 1);
    let older = published(&store, "older", 2);
    let newer = published(&store, "newer", 3);
    let unrelated = published(&store, "unrelated", 4);
    let hidden = store
        .insert_post(&write("hidden", PostStatus::Draft, 5), AUTHOR)
        .unwrap();
    let rust = category(&store, "rust");
    let web = category(&store, "web");
    for id in [source, older, newer, hidden] {
        store.replace_post_links(id, &[rust], &[]).unwrap();
    }
    store.replace_post_links(unrelated, &[web], &[]).unwrap();

    let related = queries::get_related_posts(&store, source, &[rust], 3).unwrap();
    assert_eq!(slugs(&related), vec!["newer", "older"]);

    let related = queries::get_related_posts(&store, source, &[rust], 1).unwrap();
    assert_eq!(slugs(&related), vec!["newer"]);

    let selects = store.post_selects();
    assert!(queries::get_related_posts(&store, source, &[], 3)
        .unwrap()
        .is_empty());
    assert_eq!(store.post_selects(), selects);
}

#[test]
fn views_are_counted_by_slug() {
    let store = MemoryStore::new();
    published(&store, "popular", 1);

    queries::increment_view(&store, "popular");
    queries::increment_view(&store, "popular");
    queries::increment_view(&store, "does-not-exist");

    let post = queries::get_post_by_slug(&store, "popular").unwrap().unwrap();
    assert_eq!(post.record.views, 2);
}

#[test]
fn post_lifecycle_keeps_first_publish_time() {
    let store = MemoryStore::new();
    store.add_profile(Profile {
        id: AUTHOR.to_string(),
        full_name: Some("Ada".to_string()),
        headline: None,
        bio: None,
        avatar_url: None,
    });
    let rust = category(&store, "rust");

    let mut input = PostInput {
        title: "Hello World".to_string(),
        content: Some("<h2>Intro</h2>".to_string()),
        category_ids: vec![rust],
        ..Default::default()
    };
    let draft = queries::create_post(&store, &input, AUTHOR, at(1))
        .unwrap()
        .saved()
        .unwrap();
    assert_eq!(draft.record.slug, "hello-world");
    assert_eq!(draft.record.status, PostStatus::Draft);
    assert_eq!(draft.record.published_at, None);
    assert_eq!(draft.categories.len(), 1);
    assert_eq!(draft.author.as_ref().map(|a| a.id.as_str()), Some(AUTHOR));
    assert!(queries::get_post_by_slug(&store, "hello-world").unwrap().is_none());

    input.status = Some(PostStatus::Published);
    let live = queries::update_post(&store, draft.record.id, &input, at(2))
        .unwrap()
        .unwrap()
        .saved()
        .unwrap();
    assert_eq!(live.record.published_at, Some(at(2)));
    assert!(queries::get_post_by_slug(&store, "hello-world").unwrap().is_some());

    input.status = Some(PostStatus::Draft);
    input.category_ids.clear();
    let unpublished = queries::update_post(&store, draft.record.id, &input, at(3))
        .unwrap()
        .unwrap()
        .saved()
        .unwrap();
    assert_eq!(unpublished.record.published_at, Some(at(2)));
    assert_eq!(unpublished.record.updated_at, at(3));
    assert!(unpublished.categories.is_empty());
    assert!(queries::get_post_by_slug(&store, "hello-world").unwrap().is_none());

    assert!(queries::delete_post(&store, draft.record.id, at(4)).unwrap());
    assert!(!queries::delete_post(&store, draft.record.id, at(5)).unwrap());
    let dashboard = queries::list_dashboard_posts(&store, &PostListParams::default()).unwrap();
    assert!(dashboard.data.is_empty());
    assert!(queries::update_post(&store, draft.record.id, &input, at(6))
        .unwrap()
        .is_none());
}

#[test]
fn invalid_posts_are_rejected_without_writing() {
    let store = MemoryStore::new();
    published(&store, "taken", 1);

    let input = PostInput {
        title: "Anything".to_string(),
        slug: Some("taken".to_string()),
        category_ids: vec![42],
        tag_ids: vec![7],
        ..Default::default()
    };
    let Submission::Rejected(errors) = queries::create_post(&store, &input, AUTHOR, at(2)).unwrap()
    else {
        panic!("expected a rejected submission");
    };
    let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, vec!["slug", "category_ids", "tag_ids"]);

    let dashboard = queries::list_dashboard_posts(&store, &PostListParams::default()).unwrap();
    assert_eq!(dashboard.meta.total, 1);
}

#[test]
fn deleted_posts_keep_their_slug() {
    let store = MemoryStore::new();
    let id = published(&store, "archived", 1);
    store.soft_delete_post(id, at(2)).unwrap();

    let input = PostInput {
        title: "Archived".to_string(),
        ..Default::default()
    };
    let submission = queries::create_post(&store, &input, AUTHOR, at(3)).unwrap();
    assert!(matches!(submission, Submission::Rejected(ref e) if e.has("slug")));
}

#[test]
fn categories_count_published_posts_only() {
    let store = MemoryStore::new();
    let live = published(&store, "live", 1);
    let draft = store
        .insert_post(&write("draft", PostStatus::Draft, 2), AUTHOR)
        .unwrap();
    let rust = category(&store, "rust");
    category(&store, "empty");
    store.replace_post_links(live, &[rust], &[]).unwrap();
    store.replace_post_links(draft, &[rust], &[]).unwrap();

    let categories = queries::get_categories(&store).unwrap();
    let counts: Vec<_> = categories
        .iter()
        .map(|c| (c.slug.as_str(), c.post_count))
        .collect();
    assert_eq!(counts, vec![("empty", Some(0)), ("rust", Some(1))]);

    let found = queries::get_category_by_slug(&store, "rust").unwrap().unwrap();
    assert_eq!(found.post_count, None);
    assert!(queries::get_category_by_slug(&store, "nope").unwrap().is_none());
}

#[test]
fn taxonomy_writes_validate_and_derive_slugs() {
    let store = MemoryStore::new();

    let created = queries::create_category(
        &store,
        &CategoryInput {
            name: "Web Dev".to_string(),
            color: Some("#0af".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
    .saved()
    .unwrap();
    assert_eq!(created.slug, "web-dev");

    let duplicate = queries::create_category(
        &store,
        &CategoryInput {
            name: "Web  dev!".to_string(),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(matches!(duplicate, Submission::Rejected(ref e) if e.has("slug")));

    let renamed = queries::update_category(
        &store,
        created.id,
        &CategoryInput {
            name: "Web".to_string(),
            slug: Some("web-dev".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
    .unwrap()
    .saved()
    .unwrap();
    assert_eq!(renamed.name, "Web");
    assert!(queries::update_category(&store, 99, &CategoryInput {
        name: "Ghost".to_string(),
        ..Default::default()
    })
    .unwrap()
    .is_none());

    let tag = queries::create_tag(
        &store,
        &TagInput {
            name: "Async Rust".to_string(),
            slug: None,
        },
    )
    .unwrap()
    .saved()
    .unwrap();
    assert_eq!(
        queries::get_tag_by_slug(&store, "async-rust").unwrap(),
        Some(Tag {
            id: tag.id,
            name: "Async Rust".to_string(),
            slug: "async-rust".to_string(),
        })
    );
    assert_eq!(queries::get_tags(&store).unwrap().len(), 1);
    assert!(queries::delete_tag(&store, tag.id).unwrap());
    assert!(!queries::delete_tag(&store, tag.id).unwrap());
}

#[test]
fn profiles_are_looked_up_by_id() {
    let store = MemoryStore::new();
    let profile = Profile {
        id: "abc".to_string(),
        full_name: Some("Grace".to_string()),
        headline: Some("Engineer".to_string()),
        bio: None,
        avatar_url: None,
    };
    store.add_profile(profile.clone());

    assert_eq!(queries::get_profile(&store, "abc").unwrap(), Some(profile));
    assert_eq!(queries::get_profile(&store, "zzz").unwrap(), None);
}

/// A store whose every call fails.
struct Offline;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

impl ContentStore for Offline {
    fn ping(&self) -> Result<(), StoreError> {
        offline()
    }
    fn post_ids_in_category(&self, _: &str) -> Result<Vec<PostId>, StoreError> {
        offline()
    }
    fn post_ids_with_tag(&self, _: &str) -> Result<Vec<PostId>, StoreError> {
        offline()
    }
    fn post_ids_in_categories(&self, _: &[CategoryId]) -> Result<Vec<PostId>, StoreError> {
        offline()
    }
    fn select_posts(&self, _: &PostFilter) -> Result<RowSet, StoreError> {
        offline()
    }
    fn select_post(&self, _: PostKey<'_>, _: Audience) -> Result<Option<PostJoinRow>, StoreError> {
        offline()
    }
    fn slug_taken(&self, _: SlugTable, _: &str, _: Option<u64>) -> Result<bool, StoreError> {
        offline()
    }
    fn increment_views(&self, _: &str) -> Result<(), StoreError> {
        offline()
    }
    fn insert_post(&self, _: &PostWrite, _: &str) -> Result<PostId, StoreError> {
        offline()
    }
    fn update_post(&self, _: PostId, _: &PostWrite) -> Result<bool, StoreError> {
        offline()
    }
    fn soft_delete_post(&self, _: PostId, _: NaiveDateTime) -> Result<bool, StoreError> {
        offline()
    }
    fn replace_post_links(&self, _: PostId, _: &[CategoryId], _: &[TagId]) -> Result<(), StoreError> {
        offline()
    }
    fn list_categories(&self) -> Result<Vec<CategoryCountRow>, StoreError> {
        offline()
    }
    fn find_category(&self, _: &str) -> Result<Option<Category>, StoreError> {
        offline()
    }
    fn insert_category(&self, _: &CategoryWrite) -> Result<CategoryId, StoreError> {
        offline()
    }
    fn update_category(&self, _: CategoryId, _: &CategoryWrite) -> Result<bool, StoreError> {
        offline()
    }
    fn delete_category(&self, _: CategoryId) -> Result<bool, StoreError> {
        offline()
    }
    fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        offline()
    }
    fn find_tag(&self, _: &str) -> Result<Option<Tag>, StoreError> {
        offline()
    }
    fn insert_tag(&self, _: &TagWrite) -> Result<TagId, StoreError> {
        offline()
    }
    fn update_tag(&self, _: TagId, _: &TagWrite) -> Result<bool, StoreError> {
        offline()
    }
    fn delete_tag(&self, _: TagId) -> Result<bool, StoreError> {
        offline()
    }
    fn find_profile(&self, _: &str) -> Result<Option<Profile>, StoreError> {
        offline()
    }
}

#[test]
fn store_failures_are_prefixed_with_the_operation() {
    let err = queries::get_paginated_posts(&Offline, &PostListParams::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to fetch paginated posts: store unavailable: connection refused"
    );

    let err = queries::get_post_by_slug(&Offline, "any").unwrap_err();
    assert!(err.to_string().starts_with("Failed to fetch post: "));
}

#[test]
fn failed_view_counts_are_swallowed() {
    queries::increment_view(&Offline, "any");
}
