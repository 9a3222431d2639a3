use crate::{templates, AppState, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

/// Admin panel. Only rendered when the storage client is initialized and a
/// bucket is configured; otherwise an HTML fragment listing the problems.
pub async fn admin_panel(State(state): State<Arc<AppState>>) -> Result<Response> {
    let storage = &state.storage;

    let bucket = match (storage.is_initialized(), storage.bucket()) {
        (true, Some(bucket)) => bucket,
        _ => {
            let issues = storage.configuration_issues().await;
            tracing::warn!("Admin panel requested while misconfigured: {:?}", issues);

            let mut context = tera::Context::new();
            context.insert("issues", &issues);
            let html = state
                .templates
                .render(templates::ADMIN_ERROR_TEMPLATE, &context)?;
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response());
        }
    };

    let tracks = state.metadata.load().await;

    let mut context = tera::Context::new();
    context.insert("bucket", bucket);
    context.insert("tracks", &tracks);

    let html = state.templates.render(templates::ADMIN_TEMPLATE, &context)?;
    Ok(Html(html).into_response())
}
