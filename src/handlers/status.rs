use crate::{models::StatusResponse, AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

pub async fn api_status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<StatusResponse>) {
    let storage = &state.storage;
    let storage_bucket = storage.bucket().unwrap_or("Not Configured").to_string();

    if storage.is_initialized() {
        return (
            StatusCode::OK,
            Json(StatusResponse {
                status: format!("{} Initialized", storage.client_label()),
                storage_bucket,
                details: None,
            }),
        );
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusResponse {
            status: format!("{} NOT Initialized", storage.client_label()),
            storage_bucket,
            details: storage.init_failure().map(str::to_string),
        }),
    )
}
