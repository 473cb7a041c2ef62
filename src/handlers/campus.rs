use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::CampusModel;
use crate::response::ApiResponse;
use crate::services::cache::CacheService;
use crate::services::campus::{CampusChanges, CampusWithCount, SemesterStat};
use crate::utils::text::{not_blank, validate_slug};
use crate::extract::ApiJson;
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{make_campus_service, timestamp};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCampusRequest {
    /// Display name (1-100 characters)
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub name: String,
    /// URL slug, e.g. `delhi-ncr`
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCampusRequest {
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    /// Omit to keep the current value
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CampusResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    /// Approved questions on this campus
    pub question_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl CampusResponse {
    fn new(campus: CampusModel, question_count: u64) -> Self {
        Self {
            id: campus.id,
            name: campus.name,
            slug: campus.slug,
            description: campus.description,
            image_url: campus.image_url,
            is_active: campus.is_active,
            question_count,
            created_at: timestamp(campus.created_at),
            updated_at: timestamp(campus.updated_at),
        }
    }
}

impl From<CampusWithCount> for CampusResponse {
    fn from(c: CampusWithCount) -> Self {
        Self::new(c.campus, c.question_count)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CampusSummary {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

impl From<CampusModel> for CampusSummary {
    fn from(c: CampusModel) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SemesterResponse {
    pub semester: i32,
    pub question_count: u64,
}

impl From<SemesterStat> for SemesterResponse {
    fn from(s: SemesterStat) -> Self {
        Self {
            semester: s.semester,
            question_count: s.question_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CampusSemestersResponse {
    pub campus: CampusSummary,
    pub semesters: Vec<SemesterResponse>,
}

#[utoipa::path(
    get,
    path = "/api/campuses",
    responses(
        (status = 200, description = "Active campuses with question counts", body = Vec<CampusResponse>),
    ),
    tag = "campuses"
)]
pub async fn list_campuses(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
) -> AppResult<impl IntoResponse> {
    let service = make_campus_service(db, cache.map(|c| c.0));
    let campuses = service.list().await?;
    let response: Vec<CampusResponse> = campuses.into_iter().map(CampusResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/campuses/{slug}",
    params(("slug" = String, Path, description = "Campus slug")),
    responses(
        (status = 200, description = "Campus details", body = CampusResponse),
        (status = 404, description = "Campus not found", body = AppError),
    ),
    tag = "campuses"
)]
pub async fn get_campus(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let campus = make_campus_service(db, None).get_with_count(&slug).await?;
    Ok(ApiResponse::ok(CampusResponse::from(campus)))
}

#[utoipa::path(
    get,
    path = "/api/campuses/{slug}/semesters",
    params(("slug" = String, Path, description = "Campus slug")),
    responses(
        (status = 200, description = "Question counts for semesters 1-8", body = CampusSemestersResponse),
        (status = 404, description = "Campus not found", body = AppError),
    ),
    tag = "campuses"
)]
pub async fn get_campus_semesters(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (campus, stats) = make_campus_service(db, None).semester_stats(&slug).await?;
    Ok(ApiResponse::ok(CampusSemestersResponse {
        campus: CampusSummary::from(campus),
        semesters: stats.into_iter().map(SemesterResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/campuses",
    security(("jwt_token" = [])),
    request_body = CreateCampusRequest,
    responses(
        (status = 200, description = "Campus created", body = CampusResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 409, description = "Name or slug taken", body = AppError),
    ),
    tag = "campuses"
)]
pub async fn create_campus(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    ApiJson(payload): ApiJson<CreateCampusRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = make_campus_service(db, cache.map(|c| c.0));
    let campus = service
        .create(
            payload.name.trim(),
            &payload.slug,
            payload.description,
            payload.image_url,
        )
        .await?;

    Ok(ApiResponse::with_message(
        CampusResponse::new(campus, 0),
        "Campus created",
    ))
}

#[utoipa::path(
    put,
    path = "/api/campuses/{slug}",
    security(("jwt_token" = [])),
    params(("slug" = String, Path, description = "Campus slug")),
    request_body = UpdateCampusRequest,
    responses(
        (status = 200, description = "Campus updated", body = CampusResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Campus not found", body = AppError),
        (status = 409, description = "Name taken", body = AppError),
    ),
    tag = "campuses"
)]
pub async fn update_campus(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<UpdateCampusRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = make_campus_service(db, cache.map(|c| c.0));
    service
        .update(
            &slug,
            CampusChanges {
                name: payload.name.trim().to_string(),
                description: payload.description,
                image_url: payload.image_url,
                is_active: payload.is_active,
            },
        )
        .await?;

    let campus = service.get_with_count(&slug).await?;
    Ok(ApiResponse::ok(CampusResponse::from(campus)))
}

#[utoipa::path(
    delete,
    path = "/api/campuses/{slug}",
    security(("jwt_token" = [])),
    params(("slug" = String, Path, description = "Campus slug")),
    responses(
        (status = 200, description = "Campus deleted"),
        (status = 400, description = "Campus still has questions", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Campus not found", body = AppError),
    ),
    tag = "campuses"
)]
pub async fn delete_campus(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let service = make_campus_service(db, cache.map(|c| c.0));
    service.delete(&slug).await?;
    Ok(ApiResponse::message("Campus deleted"))
}
