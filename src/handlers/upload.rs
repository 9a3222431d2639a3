//! `POST /api/upload`: stage one multipart file locally, push it to the
//! bucket, then record its metadata.

use crate::models::UploadResponse;
use crate::{audio, storage, AppError, AppState, Result};
use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Name of the multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// A file staged under the upload directory. The file is removed when this
/// is dropped, including when the request future is cancelled mid-upload.
struct StagedUpload {
    filename: String,
    path: TempPath,
    content_type: String,
}

fn multipart_error(state: &AppState, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge(state.config.max_file_size_mb)
    } else {
        AppError::BadRequest(format!("Failed to read form field: {}", e))
    }
}

/// Create `<upload_dir>/<8 random chars>-<filename>`, deleted when the
/// returned path is dropped.
fn create_staging_file(
    upload_dir: &Path,
    filename: &str,
) -> std::io::Result<(tokio::fs::File, TempPath)> {
    let suffix = format!("-{}", filename);
    let named = tempfile::Builder::new()
        .prefix("")
        .rand_bytes(8)
        .suffix(&suffix)
        .tempfile_in(upload_dir)?;
    let (file, path) = named.into_parts();
    Ok((tokio::fs::File::from_std(file), path))
}

async fn write_field(
    state: &AppState,
    field: &mut Field<'_>,
    mut file: tokio::fs::File,
    path: &Path,
) -> Result<()> {
    let max_size = state.config.max_file_size_bytes();

    let mut written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(state, e))?
    {
        written += chunk.len() as u64;
        if written > max_size {
            return Err(AppError::FileTooLarge(state.config.max_file_size_mb));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write staging file: {}", e)))?;
    }

    file.flush()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write staging file: {}", e)))?;

    tracing::debug!("Staged {} bytes at {}", written, path.display());
    Ok(())
}

/// Stream the field to the upload directory. Nothing is left on disk if
/// staging fails.
async fn stage_field(
    state: &AppState,
    mut field: Field<'_>,
    filename: String,
    content_type: String,
) -> Result<StagedUpload> {
    let (file, path) = create_staging_file(&state.config.upload_dir, &filename)
        .map_err(|e| AppError::Internal(format!("Failed to create staging file: {}", e)))?;

    // On error `path` is dropped here, which removes the partial file.
    write_field(state, &mut field, file, &path).await?;

    Ok(StagedUpload {
        filename,
        path,
        content_type,
    })
}

pub async fn upload_music(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    if !state.storage.is_initialized() {
        return Err(AppError::Configuration(format!(
            "{} is not initialized. Please check backend configuration.",
            state.storage.client_label()
        )));
    }

    // Anything that is not a multipart body has no file part.
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Rejected upload body: {}", rejection.body_text());
        AppError::BadRequest("No file part in the request".to_string())
    })?;

    let mut staged: Option<StagedUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A plain form value named "file" is not a file part.
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        if original_name.is_empty() {
            return Err(AppError::BadRequest("No selected file".to_string()));
        }

        let filename = audio::sanitize_filename(&original_name);
        if filename.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Invalid filename: {}",
                original_name
            )));
        }
        if state.config.restrict_to_audio && !audio::is_supported_audio_format(&filename) {
            return Err(AppError::BadRequest(format!(
                "Unsupported audio format: {}",
                filename
            )));
        }

        let content_type = audio::content_type_for(&filename, field.content_type());
        tracing::info!("Receiving upload {} ({})", filename, content_type);

        staged = Some(stage_field(&state, field, filename, content_type).await?);
        break;
    }

    let staged =
        staged.ok_or_else(|| AppError::BadRequest("No file part in the request".to_string()))?;

    let key = storage::music_key(&staged.filename);
    let upload_result = state
        .storage
        .upload(&staged.path, &key, &staged.content_type)
        .await;

    let staged_path = staged.path.to_path_buf();
    if let Err(e) = staged.path.close() {
        tracing::warn!(
            "Failed to remove staged file {}: {}",
            staged_path.display(),
            e
        );
    }

    let url = upload_result?;

    let record = match state.metadata.append(&staged.filename, &url).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!(
                "Metadata append failed after uploading {}, removing object: {}",
                key,
                e
            );
            if let Err(discard_err) = state.storage.discard(&key).await {
                tracing::error!("Failed to remove orphaned object {}: {}", key, discard_err);
            }
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: format!(
                "File uploaded successfully to {}",
                state.storage.provider_name()
            ),
            file_info: record,
        }),
    ))
}
