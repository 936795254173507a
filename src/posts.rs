use crate::database::blocking;
use crate::reply::{deleted, found, saved, ApiError};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use personal_site::content::{render_article, RenderedArticle};
use personal_site::models::{Paginated, Post, PostId};
use personal_site::params::{PostListParams, MAX_PAGE_SIZE};
use personal_site::queries;
use personal_site::validation::PostInput;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default)]
pub struct AllPostsQuery {
    search: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RelatedQuery {
    limit: Option<u64>,
}

#[derive(Serialize)]
pub struct PostPage {
    #[serde(flatten)]
    post: Post,
    article: RenderedArticle,
    show_toc: bool,
}

#[derive(Deserialize)]
pub struct NewPost {
    author_id: String,
    #[serde(flatten)]
    input: PostInput,
}

pub async fn get_paginated_posts_handler(
    State(state): State<AppState>,
    Query(params): Query<PostListParams>,
) -> Result<Json<Paginated<Post>>, ApiError> {
    tracing::info!("get_paginated_posts_handler started");
    let page = blocking(&state.store, move |store| {
        queries::get_paginated_posts(store, &params)
    })
    .await?;
    Ok(Json(page))
}

pub async fn get_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<AllPostsQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    tracing::info!("get_posts_handler started");
    let posts = blocking(&state.store, move |store| {
        queries::get_posts(store, query.search.as_deref(), query.category.as_deref())
    })
    .await?;
    Ok(Json(posts))
}

pub async fn get_post_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostPage>, ApiError> {
    tracing::info!("get_post_handler started: {}", slug);
    let highlighter = state.highlighter.clone();
    let page = blocking(&state.store, move |store| {
        let post = queries::get_post_by_slug(store, &slug)?;
        Ok(post.map(|post| {
            let article = render_article(post.record.content.as_deref(), &highlighter);
            PostPage {
                show_toc: article.toc.visible().is_some(),
                post,
                article,
            }
        }))
    })
    .await?;
    found(page, "Post")
}

pub async fn get_related_posts_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<RelatedQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    tracing::info!("get_related_posts_handler started: {}", slug);
    let limit = query
        .limit
        .unwrap_or(queries::DEFAULT_RELATED_LIMIT)
        .min(MAX_PAGE_SIZE);
    let related = blocking(&state.store, move |store| {
        let Some(post) = queries::get_post_by_slug(store, &slug)? else {
            return Ok(None);
        };
        let category_ids: Vec<_> = post.categories.iter().map(|c| c.id).collect();
        queries::get_related_posts(store, post.record.id, &category_ids, limit).map(Some)
    })
    .await?;
    found(related, "Post")
}

/// Always answers 204; counting failures are only logged.
pub async fn increment_view_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> StatusCode {
    let counted = blocking(&state.store, move |store| {
        queries::increment_view(store, &slug);
        Ok(())
    })
    .await;
    if counted.is_err() {
        tracing::warn!("increment_view_handler could not run the update");
    }
    StatusCode::NO_CONTENT
}

pub async fn stylesheet_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.highlighter.stylesheet(&state.config.highlight_theme) {
        Ok(css) => Ok(([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response()),
        Err(e) => {
            tracing::error!("stylesheet_handler failed: {}", e);
            Err(ApiError::Internal)
        }
    }
}

pub async fn list_dashboard_posts_handler(
    State(state): State<AppState>,
    Query(params): Query<PostListParams>,
) -> Result<Json<Paginated<Post>>, ApiError> {
    tracing::info!("list_dashboard_posts_handler started");
    let page = blocking(&state.store, move |store| {
        queries::list_dashboard_posts(store, &params)
    })
    .await?;
    Ok(Json(page))
}

pub async fn create_post_handler(
    State(state): State<AppState>,
    Json(new_post): Json<NewPost>,
) -> Result<Response, ApiError> {
    tracing::info!("create_post_handler started");
    let now = Utc::now().naive_utc();
    let submission = blocking(&state.store, move |store| {
        queries::create_post(store, &new_post.input, &new_post.author_id, now)
    })
    .await?;
    saved(submission, StatusCode::CREATED)
}

pub async fn update_post_handler(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Json(input): Json<PostInput>,
) -> Result<Response, ApiError> {
    tracing::info!("update_post_handler started: {}", id);
    let now = Utc::now().naive_utc();
    let submission = blocking(&state.store, move |store| {
        queries::update_post(store, id, &input, now)
    })
    .await?
    .ok_or(ApiError::NotFound("Post"))?;
    saved(submission, StatusCode::OK)
}

pub async fn delete_post_handler(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> Result<StatusCode, ApiError> {
    tracing::info!("delete_post_handler started: {}", id);
    let now = Utc::now().naive_utc();
    let existed =
        blocking(&state.store, move |store| queries::delete_post(store, id, now)).await?;
    deleted(existed, "Post")
}
