pub mod admin;
pub mod music;
pub mod status;
pub mod upload;

use axum::Json;
use serde_json::{json, Value};

pub async fn index() -> &'static str {
    "Radio App Backend is running! Visit /admin for the admin panel."
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "app": "radio-backend"
    }))
}
