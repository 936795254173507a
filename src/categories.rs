use crate::database::blocking;
use crate::reply::{deleted, found, saved, ApiError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use personal_site::models::{Category, CategoryId};
use personal_site::queries;
use personal_site::validation::CategoryInput;

pub async fn get_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    tracing::info!("get_categories_handler started");
    let categories = blocking(&state.store, |store| queries::get_categories(store)).await?;
    Ok(Json(categories))
}

pub async fn get_category_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>, ApiError> {
    tracing::info!("get_category_handler started: {}", slug);
    let category = blocking(&state.store, move |store| {
        queries::get_category_by_slug(store, &slug)
    })
    .await?;
    found(category, "Category")
}

pub async fn create_category_handler(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<Response, ApiError> {
    tracing::info!("create_category_handler started");
    let submission = blocking(&state.store, move |store| {
        queries::create_category(store, &input)
    })
    .await?;
    saved(submission, StatusCode::CREATED)
}

pub async fn update_category_handler(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Response, ApiError> {
    tracing::info!("update_category_handler started: {}", id);
    let submission = blocking(&state.store, move |store| {
        queries::update_category(store, id, &input)
    })
    .await?
    .ok_or(ApiError::NotFound("Category"))?;
    saved(submission, StatusCode::OK)
}

pub async fn delete_category_handler(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, ApiError> {
    tracing::info!("delete_category_handler started: {}", id);
    let existed = blocking(&state.store, move |store| queries::delete_category(store, id)).await?;
    deleted(existed, "Category")
}
