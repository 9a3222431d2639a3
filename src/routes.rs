use crate::{handlers, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Admin page assets
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/admin", get(handlers::admin::admin_panel))
        // Public API
        .route("/api/status", get(handlers::status::api_status))
        .route("/api/upload", post(handlers::upload::upload_music))
        .route("/api/music", get(handlers::music::list_music))
        .layer(DefaultBodyLimit::max(state.config.max_request_body_bytes()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
