use crate::{models::MetadataRecord, AppState};
use axum::{extract::State, Json};
use std::sync::Arc;

/// Every recorded upload, in insertion order.
pub async fn list_music(State(state): State<Arc<AppState>>) -> Json<Vec<MetadataRecord>> {
    Json(state.metadata.load().await)
}
