use crate::database::blocking;
use crate::reply::{deleted, found, saved, ApiError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use personal_site::models::{Tag, TagId};
use personal_site::queries;
use personal_site::validation::TagInput;

pub async fn get_tags_handler(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    tracing::info!("get_tags_handler started");
    let tags = blocking(&state.store, |store| queries::get_tags(store)).await?;
    Ok(Json(tags))
}

pub async fn get_tag_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    tracing::info!("get_tag_handler started: {}", slug);
    let tag = blocking(&state.store, move |store| queries::get_tag_by_slug(store, &slug)).await?;
    found(tag, "Tag")
}

pub async fn create_tag_handler(
    State(state): State<AppState>,
    Json(input): Json<TagInput>,
) -> Result<Response, ApiError> {
    tracing::info!("create_tag_handler started");
    let submission = blocking(&state.store, move |store| queries::create_tag(store, &input)).await?;
    saved(submission, StatusCode::CREATED)
}

pub async fn update_tag_handler(
    State(state): State<AppState>,
    Path(id): Path<TagId>,
    Json(input): Json<TagInput>,
) -> Result<Response, ApiError> {
    tracing::info!("update_tag_handler started: {}", id);
    let submission = blocking(&state.store, move |store| {
        queries::update_tag(store, id, &input)
    })
    .await?
    .ok_or(ApiError::NotFound("Tag"))?;
    saved(submission, StatusCode::OK)
}

pub async fn delete_tag_handler(
    State(state): State<AppState>,
    Path(id): Path<TagId>,
) -> Result<StatusCode, ApiError> {
    tracing::info!("delete_tag_handler started: {}", id);
    let existed = blocking(&state.store, move |store| queries::delete_tag(store, id)).await?;
    deleted(existed, "Tag")
}
