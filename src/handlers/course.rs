use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::CourseModel;
use crate::response::ApiResponse;
use crate::services::course::{CourseChanges, CourseService, CourseWithCount};
use crate::utils::text::not_blank;
use crate::extract::{ApiJson, ApiQuery};
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::question::QuestionResponse;
use super::timestamp;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCoursesQuery {
    /// Include inactive courses
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCourseRequest {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Academic year, e.g. 2024
    #[validate(range(min = 2000, max = 2100))]
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseRequest {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 2000, max = 2100))]
    pub year: Option<i32>,
    /// Omit to keep the current value
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub is_active: bool,
    pub question_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl CourseResponse {
    fn new(course: CourseModel, question_count: u64) -> Self {
        Self {
            id: course.id,
            name: course.name,
            description: course.description,
            year: course.year,
            is_active: course.is_active,
            question_count,
            created_at: timestamp(course.created_at),
            updated_at: timestamp(course.updated_at),
        }
    }
}

impl From<CourseWithCount> for CourseResponse {
    fn from(c: CourseWithCount) -> Self {
        Self::new(c.course, c.question_count)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub questions: Vec<QuestionResponse>,
}

#[utoipa::path(
    get,
    path = "/api/courses",
    params(ListCoursesQuery),
    responses(
        (status = 200, description = "Courses, newest year first", body = Vec<CourseResponse>),
    ),
    tag = "courses"
)]
pub async fn list_courses(
    Extension(db): Extension<DatabaseConnection>,
    ApiQuery(query): ApiQuery<ListCoursesQuery>,
) -> AppResult<impl IntoResponse> {
    let courses = CourseService::new(db).list(query.include_inactive).await?;
    let response: Vec<CourseResponse> = courses.into_iter().map(CourseResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with its questions", body = CourseDetailResponse),
        (status = 404, description = "Course not found", body = AppError),
    ),
    tag = "courses"
)]
pub async fn get_course(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let (course, questions) = CourseService::new(db).get_with_questions(id).await?;
    let count = questions.len() as u64;
    Ok(ApiResponse::ok(CourseDetailResponse {
        course: CourseResponse::new(course, count),
        questions: questions.into_iter().map(QuestionResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/courses",
    security(("jwt_token" = [])),
    request_body = CreateCourseRequest,
    responses(
        (status = 200, description = "Course created", body = CourseResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 409, description = "Course name taken", body = AppError),
    ),
    tag = "courses"
)]
pub async fn create_course(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    ApiJson(payload): ApiJson<CreateCourseRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let course = CourseService::new(db)
        .create(&payload.name, payload.description, payload.year)
        .await?;
    Ok(ApiResponse::ok(CourseResponse::new(course, 0)))
}

#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Course not found", body = AppError),
        (status = 409, description = "Course name taken", body = AppError),
    ),
    tag = "courses"
)]
pub async fn update_course(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<UpdateCourseRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = CourseService::new(db);
    service
        .update(
            id,
            CourseChanges {
                name: payload.name,
                description: payload.description,
                year: payload.year,
                is_active: payload.is_active,
            },
        )
        .await?;

    let (course, questions) = service.get_with_questions(id).await?;
    Ok(ApiResponse::ok(CourseResponse::new(
        course,
        questions.len() as u64,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 400, description = "Course still has questions", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Course not found", body = AppError),
    ),
    tag = "courses"
)]
pub async fn delete_course(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    CourseService::new(db).delete(id).await?;
    Ok(ApiResponse::message("Course deleted"))
}
