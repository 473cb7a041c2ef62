use axum::{response::IntoResponse, Extension, Json};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadHealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    Json(HealthResponse {
        status: if db_ok { "ok" } else { "degraded" },
        service: "nst-buddy",
        version: env!("CARGO_PKG_VERSION"),
        database: db_ok,
    })
}

/// Liveness check of the upload service; also the keep-alive target.
pub async fn upload_health() -> impl IntoResponse {
    Json(UploadHealthResponse {
        status: "ok",
        service: "upload-service",
    })
}
