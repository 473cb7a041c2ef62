use crate::config::cloudinary::CloudinaryConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use axum::body::Bytes;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::sync::Arc;
use std::time::Duration;

pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024; // 50 MiB
pub const UPLOAD_TAGS: &str = "ai-training,nst,user-contribution";

const PDF: &str = "application/pdf";
const DOC: &str = "application/msword";
const PPT: &str = "application/vnd.ms-powerpoint";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[PDF, DOC, DOCX, PPT, PPTX];

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Check file magic bytes against the declared content type. Office Open XML
/// files are zip archives; legacy Office files are OLE compound documents.
fn validate_magic_bytes(data: &[u8], content_type: &str) -> bool {
    match content_type {
        PDF => data.starts_with(PDF_MAGIC),
        DOCX | PPTX => data.starts_with(ZIP_MAGIC),
        DOC | PPT => data.starts_with(OLE_MAGIC),
        _ => false,
    }
}

/// Strip parameters such as `; charset=binary` and normalise case.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn validate_document(data: &[u8], content_type: &str) -> AppResult<()> {
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if data.len() > MAX_UPLOAD_SIZE {
        return Err(AppError::PayloadTooLarge);
    }

    let content_type = essence(content_type);
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::Validation(
            "Invalid file type. Only PDF, DOC, DOCX, PPT and PPTX files are allowed.".to_string(),
        ));
    }

    if !validate_magic_bytes(data, &content_type) {
        return Err(AppError::Validation(
            "File content does not match declared content type".to_string(),
        ));
    }

    Ok(())
}

/// A buffered multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Where the media host put the file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
    pub format: Option<String>,
    pub bytes: u64,
    pub uploaded_at: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, file: &UploadedFile, uploader_email: &str) -> AppResult<StoredMedia>;
}

pub type SharedMediaStore = Arc<dyn MediaStore>;

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
    format: Option<String>,
    bytes: u64,
    created_at: String,
}

/// Signed uploads to Cloudinary's REST API.
pub struct CloudinaryStore {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn store(&self, file: &UploadedFile, uploader_email: &str) -> AppResult<StoredMedia> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let context = upload_context(
            &file.file_name,
            uploader_email,
            &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        );

        let params = [
            ("context", context.as_str()),
            ("folder", self.config.folder.as_str()),
            ("tags", UPLOAD_TAGS),
            ("timestamp", timestamp.as_str()),
        ];
        let signature = sign_params(&params, &self.config.api_secret);

        let part = reqwest::multipart::Part::bytes(file.data.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| AppError::Validation(format!("Invalid content type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        for (name, value) in params {
            form = form.text(name.to_string(), value.to_string());
        }
        form = form
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);

        let response = self
            .http
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::BadGateway(format!("Cloudinary request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadGateway(format!(
                "Cloudinary responded {}: {}",
                status, body
            )));
        }

        let uploaded: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::BadGateway(format!("Invalid Cloudinary response: {}", e)))?;

        Ok(StoredMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            format: uploaded.format,
            bytes: uploaded.bytes,
            uploaded_at: uploaded.created_at,
        })
    }
}

/// Cloudinary signature: sorted `key=value` pairs joined by `&`, followed by
/// the API secret, hashed with SHA-1.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{:x}", Sha1::digest(format!("{}{}", to_sign, api_secret)))
}

/// `key=value` pairs joined by `|`; both separators are backslash-escaped
/// inside values.
fn upload_context(file_name: &str, email: &str, uploaded_at: &str) -> String {
    let escape = |v: &str| v.replace('\\', "\\\\").replace('=', "\\=").replace('|', "\\|");
    format!(
        "filename={}|email={}|uploaded_at={}",
        escape(file_name),
        escape(email),
        escape(uploaded_at)
    )
}

pub struct UploadService {
    store: SharedMediaStore,
}

impl UploadService {
    pub fn new(store: SharedMediaStore) -> Self {
        Self { store }
    }

    pub async fn upload(&self, file: UploadedFile, uploader_email: &str) -> AppResult<StoredMedia> {
        validate_document(&file.data, &file.content_type)?;

        tracing::info!(
            file_name = %file.file_name,
            bytes = file.data.len(),
            uploader = %uploader_email,
            "Uploading file"
        );

        let stored = self.store.store(&file, uploader_email).await?;
        tracing::info!(public_id = %stored.public_id, "Upload stored");
        Ok(stored)
    }
}
