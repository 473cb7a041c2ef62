use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::QuestionModel;
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::cache::CacheService;
use crate::services::contribution::{ContributionService, NewContribution, POINTS_PER_CONTRIBUTION};
use crate::services::question::{
    ensure_valid_semester, QuestionFilter, QuestionInput, QuestionService, DEFAULT_SEMESTER,
};
use crate::utils::text::not_blank;
use crate::extract::{ApiJson, ApiQuery};
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{make_campus_service, timestamp};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuestionsQuery {
    /// Campus slug
    pub campus: Option<String>,
    /// Semester 1-8
    pub semester: Option<i32>,
    /// Exact subject
    pub subject: Option<String>,
    /// Exact topic
    pub topic: Option<String>,
    /// Case-insensitive match on name, topic or subject
    pub search: Option<String>,
    pub course_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FiltersQuery {
    pub campus: Option<String>,
    pub semester: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminQuestionsQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Only approved (`true`) or only pending (`false`) questions
    pub approved: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContributeRequest {
    #[validate(custom(function = "not_blank"))]
    pub campus_slug: String,
    #[validate(range(min = 1, max = 8))]
    pub semester: i32,
    #[validate(length(max = 300), custom(function = "not_blank"))]
    pub question_name: String,
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub subject: String,
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub topic: String,
    /// Link to the problem statement
    #[validate(url)]
    pub link: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct QuestionRequest {
    #[validate(length(max = 300), custom(function = "not_blank"))]
    pub question_name: String,
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub subject: String,
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub topic: String,
    #[validate(url)]
    pub link: String,
    /// Defaults to 4 on create; omitted on update keeps the current value
    pub semester: Option<i32>,
    pub year: Option<i32>,
    pub campus_slug: Option<String>,
    pub course_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApprovalRequest {
    pub is_approved: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: i32,
    pub question_name: String,
    pub subject: String,
    pub topic: String,
    pub link: String,
    pub semester: i32,
    pub year: Option<i32>,
    pub is_approved: bool,
    pub campus_id: Option<i32>,
    pub course_id: Option<i32>,
    /// Whether a student contributed this question
    pub is_contribution: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<QuestionModel> for QuestionResponse {
    fn from(q: QuestionModel) -> Self {
        Self {
            id: q.id,
            question_name: q.question_name,
            subject: q.subject,
            topic: q.topic,
            link: q.link,
            semester: q.semester,
            year: q.year,
            is_approved: q.is_approved,
            campus_id: q.campus_id,
            course_id: q.course_id,
            is_contribution: q.contributor_email.is_some(),
            created_at: timestamp(q.created_at),
            updated_at: timestamp(q.updated_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FiltersResponse {
    pub subjects: Vec<String>,
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContributeResponse {
    pub question: QuestionResponse,
    pub campus_slug: String,
    pub points_awarded: i32,
}

/// Resolve the optional campus slug and semester shared by the read endpoints.
async fn scope_filter(
    db: &DatabaseConnection,
    campus: Option<&str>,
    semester: Option<i32>,
) -> AppResult<QuestionFilter> {
    if let Some(semester) = semester {
        ensure_valid_semester(semester)?;
    }

    let campus_id = resolve_campus_id(db, campus).await?;

    Ok(QuestionFilter {
        campus_id,
        semester,
        ..Default::default()
    })
}

async fn resolve_campus_id(
    db: &DatabaseConnection,
    campus_slug: Option<&str>,
) -> AppResult<Option<i32>> {
    match campus_slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => Ok(Some(
            make_campus_service(db.clone(), None)
                .get_by_slug(slug)
                .await?
                .id,
        )),
        None => Ok(None),
    }
}

async fn invalidate_campus_list(db: DatabaseConnection, cache: Option<Extension<CacheService>>) {
    make_campus_service(db, cache.map(|c| c.0))
        .invalidate_list_cache()
        .await;
}

#[utoipa::path(
    get,
    path = "/api/questions",
    params(ListQuestionsQuery),
    responses(
        (status = 200, description = "Approved questions, newest first", body = Vec<QuestionResponse>),
        (status = 400, description = "Invalid semester", body = AppError),
        (status = 404, description = "Campus not found", body = AppError),
    ),
    tag = "questions"
)]
pub async fn list_questions(
    Extension(db): Extension<DatabaseConnection>,
    ApiQuery(query): ApiQuery<ListQuestionsQuery>,
) -> AppResult<impl IntoResponse> {
    let mut filter = scope_filter(&db, query.campus.as_deref(), query.semester).await?;
    filter.subject = query.subject;
    filter.topic = query.topic;
    filter.search = query.search;
    filter.course_id = query.course_id;

    let questions = QuestionService::new(db).list(&filter).await?;
    let response: Vec<QuestionResponse> =
        questions.into_iter().map(QuestionResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/questions/filters",
    params(FiltersQuery),
    responses(
        (status = 200, description = "Distinct subjects and topics", body = FiltersResponse),
        (status = 400, description = "Invalid semester", body = AppError),
        (status = 404, description = "Campus not found", body = AppError),
    ),
    tag = "questions"
)]
pub async fn get_filters(
    Extension(db): Extension<DatabaseConnection>,
    ApiQuery(query): ApiQuery<FiltersQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = scope_filter(&db, query.campus.as_deref(), query.semester).await?;
    let (subjects, topics) = QuestionService::new(db).filters(&filter).await?;
    Ok(ApiResponse::ok(FiltersResponse { subjects, topics }))
}

#[utoipa::path(
    post,
    path = "/api/questions/contribute",
    security(("jwt_token" = [])),
    request_body = ContributeRequest,
    responses(
        (status = 200, description = "Question contributed", body = ContributeResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Campus not found", body = AppError),
        (status = 409, description = "Duplicate question", body = AppError),
    ),
    tag = "questions"
)]
pub async fn contribute_question(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    ApiJson(payload): ApiJson<ContributeRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (question, campus) = ContributionService::new(db.clone())
        .contribute(
            auth_user.user_id,
            NewContribution {
                campus_slug: payload.campus_slug,
                semester: payload.semester,
                question_name: payload.question_name,
                subject: payload.subject,
                topic: payload.topic,
                link: payload.link,
            },
        )
        .await?;

    invalidate_campus_list(db, cache).await;

    Ok(ApiResponse::with_message(
        ContributeResponse {
            question: QuestionResponse::from(question),
            campus_slug: campus.slug,
            points_awarded: POINTS_PER_CONTRIBUTION,
        },
        format!("Thanks! You earned {} points", POINTS_PER_CONTRIBUTION),
    ))
}

#[utoipa::path(
    post,
    path = "/api/questions",
    security(("jwt_token" = [])),
    request_body = QuestionRequest,
    responses(
        (status = 200, description = "Question created", body = QuestionResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Campus or course not found", body = AppError),
        (status = 409, description = "Duplicate question", body = AppError),
    ),
    tag = "questions"
)]
pub async fn create_question(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    ApiJson(payload): ApiJson<QuestionRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let campus_id = resolve_campus_id(&db, payload.campus_slug.as_deref()).await?;
    let question = QuestionService::new(db.clone())
        .create(QuestionInput {
            question_name: payload.question_name,
            subject: payload.subject,
            topic: payload.topic,
            link: payload.link,
            semester: payload.semester.unwrap_or(DEFAULT_SEMESTER),
            year: payload.year,
            campus_id,
            course_id: payload.course_id,
        })
        .await?;

    invalidate_campus_list(db, cache).await;
    Ok(ApiResponse::ok(QuestionResponse::from(question)))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Question ID")),
    request_body = QuestionRequest,
    responses(
        (status = 200, description = "Question updated", body = QuestionResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Question, campus or course not found", body = AppError),
        (status = 409, description = "Duplicate question", body = AppError),
    ),
    tag = "questions"
)]
pub async fn update_question(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<QuestionRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = QuestionService::new(db.clone());
    let existing = service.get_by_id(id).await?;
    let campus_id = match payload.campus_slug.as_deref() {
        Some(slug) => resolve_campus_id(&db, Some(slug)).await?,
        None => existing.campus_id,
    };

    let question = service
        .update(
            id,
            QuestionInput {
                question_name: payload.question_name,
                subject: payload.subject,
                topic: payload.topic,
                link: payload.link,
                semester: payload.semester.unwrap_or(existing.semester),
                year: payload.year,
                campus_id,
                course_id: payload.course_id,
            },
        )
        .await?;

    invalidate_campus_list(db, cache).await;
    Ok(ApiResponse::ok(QuestionResponse::from(question)))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}/approval",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Question ID")),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Approval updated", body = QuestionResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Question not found", body = AppError),
    ),
    tag = "questions"
)]
pub async fn set_question_approval(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<ApprovalRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let question = QuestionService::new(db.clone())
        .set_approval(id, payload.is_approved)
        .await?;

    invalidate_campus_list(db, cache).await;
    Ok(ApiResponse::ok(QuestionResponse::from(question)))
}

#[utoipa::path(
    delete,
    path = "/api/questions/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question deleted"),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Question not found", body = AppError),
    ),
    tag = "questions"
)]
pub async fn delete_question(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    QuestionService::new(db.clone()).delete(id).await?;

    invalidate_campus_list(db, cache).await;
    Ok(ApiResponse::message("Question deleted"))
}

#[utoipa::path(
    get,
    path = "/api/admin/questions",
    security(("jwt_token" = [])),
    params(AdminQuestionsQuery),
    responses(
        (status = 200, description = "All questions, paginated", body = PaginatedResponse<QuestionResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_admin_questions(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    ApiQuery(query): ApiQuery<AdminQuestionsQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let (page, per_page) = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let (questions, total) = QuestionService::new(db)
        .list_for_admin(query.approved, page, per_page)
        .await?;
    let items: Vec<QuestionResponse> = questions.into_iter().map(QuestionResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}
