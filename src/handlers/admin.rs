use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::admin::AdminService;
use crate::extract::{ApiJson, ApiQuery};
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::auth::UserResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetProRequest {
    pub is_pro: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_users: u64,
    pub total_questions: u64,
    pub pending_questions: u64,
    pub total_campuses: u64,
    pub total_courses: u64,
    pub active_notices: u64,
    pub questions_today: u64,
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Platform statistics", body = StatsResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn get_stats(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let stats = AdminService::new(db).get_stats().await?;

    Ok(ApiResponse::ok(StatsResponse {
        total_users: stats.total_users,
        total_questions: stats.total_questions,
        pending_questions: stats.pending_questions,
        total_campuses: stats.total_campuses,
        total_courses: stats.total_courses,
        active_notices: stats.active_notices,
        questions_today: stats.questions_today,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    security(("jwt_token" = [])),
    params(PaginationQuery),
    responses(
        (status = 200, description = "Users, newest first", body = PaginatedResponse<UserResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_users(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    ApiQuery(params): ApiQuery<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let (page, per_page) = params.resolve();
    let (users, total) = AdminService::new(db).list_users(page, per_page).await?;
    let items = users.into_iter().map(UserResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/pro",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetProRequest,
    responses(
        (status = 200, description = "Pro flag updated", body = UserResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn set_user_pro(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<SetProRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let user = AdminService::new(db).set_pro(id, payload.is_pro).await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/admin",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetAdminRequest,
    responses(
        (status = 200, description = "Admin flag updated", body = UserResponse),
        (status = 400, description = "Cannot revoke own admin access", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn set_user_admin(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<SetAdminRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let user = AdminService::new(db)
        .set_admin(auth_user.user_id, id, payload.is_admin)
        .await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}
