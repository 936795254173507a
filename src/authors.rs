use crate::database::blocking;
use crate::reply::{found, ApiError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use personal_site::models::Profile;
use personal_site::queries;

pub async fn get_author_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    tracing::info!("get_author_handler started: {}", id);
    let profile = blocking(&state.store, move |store| queries::get_profile(store, &id)).await?;
    found(profile, "Author")
}
