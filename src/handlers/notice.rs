use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::NoticeModel;
use crate::response::ApiResponse;
use crate::services::notice::{parse_expiry, parse_priority, NoticeInput, NoticeService};
use crate::utils::text::not_blank;
use crate::extract::ApiJson;
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::timestamp;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NoticeRequest {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub title: String,
    #[validate(length(max = 10000), custom(function = "not_blank"))]
    pub content: String,
    /// `low`, `normal` (default), `high` or `urgent`
    pub priority: Option<String>,
    /// Defaults to active on create; omitted on update keeps the current value
    pub is_active: Option<bool>,
    /// RFC 3339 timestamp; omit for a notice that never expires
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoticeResponse {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub priority: String,
    pub is_active: bool,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<NoticeModel> for NoticeResponse {
    fn from(n: NoticeModel) -> Self {
        Self {
            id: n.id,
            title: n.title,
            content: n.content,
            priority: n.priority,
            is_active: n.is_active,
            expires_at: n.expires_at.map(timestamp),
            created_at: timestamp(n.created_at),
            updated_at: timestamp(n.updated_at),
        }
    }
}

fn notice_input(payload: NoticeRequest) -> AppResult<NoticeInput> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    Ok(NoticeInput {
        priority: parse_priority(payload.priority.as_deref())?,
        expires_at: parse_expiry(payload.expires_at.as_deref())?,
        title: payload.title,
        content: payload.content,
        is_active: payload.is_active,
    })
}

#[utoipa::path(
    get,
    path = "/api/notices",
    responses(
        (status = 200, description = "Active notices, most important first", body = Vec<NoticeResponse>),
    ),
    tag = "notices"
)]
pub async fn list_notices(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let notices = NoticeService::new(db).list_visible().await?;
    let response: Vec<NoticeResponse> = notices.into_iter().map(NoticeResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/notices/all",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Every notice, newest first", body = Vec<NoticeResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "notices"
)]
pub async fn list_all_notices(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let notices = NoticeService::new(db).list_all().await?;
    let response: Vec<NoticeResponse> = notices.into_iter().map(NoticeResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    post,
    path = "/api/notices",
    security(("jwt_token" = [])),
    request_body = NoticeRequest,
    responses(
        (status = 200, description = "Notice created", body = NoticeResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "notices"
)]
pub async fn create_notice(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    ApiJson(payload): ApiJson<NoticeRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let input = notice_input(payload)?;
    let notice = NoticeService::new(db).create(input).await?;
    Ok(ApiResponse::ok(NoticeResponse::from(notice)))
}

#[utoipa::path(
    put,
    path = "/api/notices/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Notice ID")),
    request_body = NoticeRequest,
    responses(
        (status = 200, description = "Notice updated", body = NoticeResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Notice not found", body = AppError),
    ),
    tag = "notices"
)]
pub async fn update_notice(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<NoticeRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let input = notice_input(payload)?;
    let notice = NoticeService::new(db).update(id, input).await?;
    Ok(ApiResponse::ok(NoticeResponse::from(notice)))
}

#[utoipa::path(
    delete,
    path = "/api/notices/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Notice ID")),
    responses(
        (status = 200, description = "Notice deleted"),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Notice not found", body = AppError),
    ),
    tag = "notices"
)]
pub async fn delete_notice(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    NoticeService::new(db).delete(id).await?;
    Ok(ApiResponse::message("Notice deleted"))
}
