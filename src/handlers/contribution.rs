use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::contribution::{Contribution, ContributionService, LeaderboardEntry};
use crate::extract::ApiQuery;
use axum::{response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::timestamp;

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// Number of entries, 1-100 (default 10)
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntryResponse {
    pub rank: u64,
    pub name: String,
    pub picture: Option<String>,
    pub contribution_count: i32,
    pub contribution_points: i32,
}

impl From<LeaderboardEntry> for LeaderboardEntryResponse {
    fn from(e: LeaderboardEntry) -> Self {
        Self {
            rank: e.rank,
            name: e.name,
            picture: e.picture,
            contribution_count: e.contribution_count,
            contribution_points: e.contribution_points,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContributionResponse {
    pub id: i32,
    pub question_name: String,
    pub subject: String,
    pub topic: String,
    pub link: String,
    pub semester: i32,
    pub campus_name: Option<String>,
    pub campus_slug: Option<String>,
    pub created_at: String,
}

impl From<&Contribution> for ContributionResponse {
    fn from(c: &Contribution) -> Self {
        let q = &c.question;
        Self {
            id: q.id,
            question_name: q.question_name.clone(),
            subject: q.subject.clone(),
            topic: q.topic.clone(),
            link: q.link.clone(),
            semester: q.semester,
            campus_name: c.campus.as_ref().map(|campus| campus.name.clone()),
            campus_slug: c.campus.as_ref().map(|campus| campus.slug.clone()),
            created_at: timestamp(q.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyStatsResponse {
    pub contribution_count: i32,
    pub contribution_points: i32,
    /// 1 + number of users with more points
    pub rank: u64,
    pub contributions: Vec<ContributionResponse>,
    /// The five most recent contributions
    pub recent_contributions: Vec<ContributionResponse>,
}

#[utoipa::path(
    get,
    path = "/api/contributions/leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Top contributors", body = Vec<LeaderboardEntryResponse>),
    ),
    tag = "contributions"
)]
pub async fn leaderboard(
    Extension(db): Extension<DatabaseConnection>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> AppResult<impl IntoResponse> {
    let entries = ContributionService::new(db).leaderboard(query.limit).await?;
    let response: Vec<LeaderboardEntryResponse> = entries
        .into_iter()
        .map(LeaderboardEntryResponse::from)
        .collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/contributions/my-stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Caller's contribution stats", body = MyStatsResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "contributions"
)]
pub async fn my_stats(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let stats = ContributionService::new(db)
        .my_stats(auth_user.user_id)
        .await?;

    Ok(ApiResponse::ok(MyStatsResponse {
        contribution_count: stats.user.contribution_count,
        contribution_points: stats.user.contribution_points,
        rank: stats.rank,
        recent_contributions: stats.recent().iter().map(ContributionResponse::from).collect(),
        contributions: stats
            .contributions
            .iter()
            .map(ContributionResponse::from)
            .collect(),
    }))
}
