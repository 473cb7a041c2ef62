use crate::error::{AppError, AppResult};
use crate::middleware::Uploader;
use crate::services::upload::{SharedMediaStore, UploadService, UploadedFile};
use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    /// Public HTTPS URL of the stored file
    pub url: String,
    pub public_id: String,
    pub format: Option<String>,
    pub bytes: u64,
    pub uploaded_at: String,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(format!("Failed to read upload: {}", e.body_text()))
    }
}

/// Upload a document to the media host.
/// POST /api/upload (multipart form: field "file", optional "fileName")
#[utoipa::path(
    post,
    path = "/api/upload",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing or unsupported file", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 413, description = "File larger than 50 MiB", body = AppError),
        (status = 502, description = "Media host failed", body = AppError),
    ),
    tag = "uploads"
)]
pub async fn upload_file(
    Extension(store): Extension<SharedMediaStore>,
    uploader: Uploader,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut file: Option<UploadedFile> = None;
    let mut file_name_override: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    file_name: original_name,
                    content_type,
                    data,
                });
            }
            Some("fileName") => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = value.trim();
                if !value.is_empty() {
                    file_name_override = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    let mut file = file.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    if let Some(name) = file_name_override {
        file.file_name = name;
    }

    let stored = UploadService::new(store)
        .upload(file, &uploader.email)
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        url: stored.url,
        public_id: stored.public_id,
        format: stored.format,
        bytes: stored.bytes,
        uploaded_at: stored.uploaded_at,
    }))
}
