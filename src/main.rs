mod authors;
mod categories;
mod database;
mod health;
mod posts;
mod reply;
mod tags;

use crate::reply::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::{self, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use dotenv::dotenv;
use personal_site::config::AppConfig;
use personal_site::content::Highlighter;
use personal_site::store::ContentStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub highlighter: Arc<Highlighter>,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format!(
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("invalid configuration: {}", e);
        e
    })?;
    let store = database::open_store(&config.store).map_err(|e| {
        tracing::error!("could not open store: {}", e);
        e
    })?;

    let state = AppState {
        store,
        highlighter: Arc::new(Highlighter::new()),
        config: Arc::new(config),
    };
    let bind_addr = state.config.bind_addr;

    let admin = Router::new()
        .route(
            "/posts",
            get(posts::list_dashboard_posts_handler).post(posts::create_post_handler),
        )
        .route(
            "/posts/:id",
            put(posts::update_post_handler).delete(posts::delete_post_handler),
        )
        .route("/categories", post(categories::create_category_handler))
        .route(
            "/categories/:id",
            put(categories::update_category_handler).delete(categories::delete_category_handler),
        )
        .route("/tags", post(tags::create_tag_handler))
        .route(
            "/tags/:id",
            put(tags::update_tag_handler).delete(tags::delete_tag_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            validation_fingerprint,
        ));

    let app = Router::new()
        .route("/api/healthcheck", get(health::health_check_handler))
        .route("/api/posts", get(posts::get_paginated_posts_handler))
        .route("/api/posts/all", get(posts::get_posts_handler))
        .route("/api/posts/:slug", get(posts::get_post_handler))
        .route(
            "/api/posts/:slug/related",
            get(posts::get_related_posts_handler),
        )
        .route("/api/posts/:slug/views", post(posts::increment_view_handler))
        .route("/api/categories", get(categories::get_categories_handler))
        .route("/api/categories/:slug", get(categories::get_category_handler))
        .route("/api/tags", get(tags::get_tags_handler))
        .route("/api/tags/:slug", get(tags::get_tag_handler))
        .route("/api/authors/:id", get(authors::get_author_handler))
        .route("/api/highlight.css", get(posts::stylesheet_handler))
        .nest("/api/admin", admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn validation_fingerprint(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    tracing::trace!("validation_fingerprint started");
    let expected_auth = format!("Bearer {}", state.config.api_token);

    let presented = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if presented != Some(expected_auth.as_str()) {
        tracing::error!("validation_fingerprint not valid");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}
