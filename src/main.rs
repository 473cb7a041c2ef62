use axum::{extract::Extension, middleware, Router};
use nst_buddy::config;
use nst_buddy::handlers;
use nst_buddy::middleware::cors::build_cors_layer;
use nst_buddy::middleware::security::{security_headers_middleware, SecurityHeaders};
use nst_buddy::migration;
use nst_buddy::routes;
use nst_buddy::services::cache::CacheService;
use nst_buddy::services::identity::{FirebaseIdentityProvider, SharedIdentityProvider};
use nst_buddy::utils;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        // Auth
        handlers::auth::verify_token,
        handlers::auth::logout,
        handlers::auth::get_current_user,
        handlers::auth::pro_check,
        handlers::auth::list_admins,
        handlers::auth::setup_admin,
        handlers::auth::admin_login,
        // Campuses
        handlers::campus::list_campuses,
        handlers::campus::get_campus,
        handlers::campus::get_campus_semesters,
        handlers::campus::create_campus,
        handlers::campus::update_campus,
        handlers::campus::delete_campus,
        // Questions
        handlers::question::list_questions,
        handlers::question::get_filters,
        handlers::question::contribute_question,
        handlers::question::create_question,
        handlers::question::update_question,
        handlers::question::set_question_approval,
        handlers::question::delete_question,
        handlers::question::list_admin_questions,
        // Contributions
        handlers::contribution::leaderboard,
        handlers::contribution::my_stats,
        // Courses
        handlers::course::list_courses,
        handlers::course::get_course,
        handlers::course::create_course,
        handlers::course::update_course,
        handlers::course::delete_course,
        // Notices
        handlers::notice::list_notices,
        handlers::notice::list_all_notices,
        handlers::notice::create_notice,
        handlers::notice::update_notice,
        handlers::notice::delete_notice,
        // Admin
        handlers::admin::get_stats,
        handlers::admin::list_users,
        handlers::admin::set_user_pro,
        handlers::admin::set_user_admin,
    ),
    components(
        schemas(
            nst_buddy::response::ApiResponse<serde_json::Value>,
            nst_buddy::response::PaginatedResponse<serde_json::Value>,
            nst_buddy::response::PaginationQuery,
            nst_buddy::error::AppError,
            handlers::health::HealthResponse,
            // Auth
            handlers::auth::VerifyTokenRequest,
            handlers::auth::SetupAdminRequest,
            handlers::auth::AdminLoginRequest,
            handlers::auth::UserResponse,
            handlers::auth::AdminResponse,
            handlers::auth::SessionResponse,
            handlers::auth::AdminSessionResponse,
            handlers::auth::ProCheckResponse,
            // Campuses
            handlers::campus::CreateCampusRequest,
            handlers::campus::UpdateCampusRequest,
            handlers::campus::CampusResponse,
            handlers::campus::CampusSummary,
            handlers::campus::SemesterResponse,
            handlers::campus::CampusSemestersResponse,
            // Questions
            handlers::question::ContributeRequest,
            handlers::question::QuestionRequest,
            handlers::question::ApprovalRequest,
            handlers::question::QuestionResponse,
            handlers::question::FiltersResponse,
            handlers::question::ContributeResponse,
            // Contributions
            handlers::contribution::LeaderboardEntryResponse,
            handlers::contribution::ContributionResponse,
            handlers::contribution::MyStatsResponse,
            // Courses
            handlers::course::CreateCourseRequest,
            handlers::course::UpdateCourseRequest,
            handlers::course::CourseResponse,
            handlers::course::CourseDetailResponse,
            // Notices
            handlers::notice::NoticeRequest,
            handlers::notice::NoticeResponse,
            // Admin
            handlers::admin::StatsResponse,
            handlers::admin::SetProRequest,
            handlers::admin::SetAdminRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Sign-in, sessions and admin setup"),
        (name = "campuses", description = "Campus catalogue"),
        (name = "questions", description = "Question bank and contributions"),
        (name = "contributions", description = "Leaderboard and contributor stats"),
        (name = "courses", description = "Course catalogue"),
        (name = "notices", description = "Announcements"),
        (name = "admin", description = "Administrative operations"),
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    config::logging::init_tracing("nst_buddy=debug,tower_http=debug,axum=debug");

    // Validate configuration before doing anything else
    let (jwt_config, firebase_config) = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting NST Buddy API v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    // Redis is optional; the campus list is simply not cached without it
    let cache = match config::redis::get_redis().await {
        Ok(Some(conn)) => {
            tracing::info!("Redis connected successfully");
            Some(CacheService::new(conn))
        }
        Ok(None) => {
            tracing::info!("REDIS_URL not set, running without cache");
            None
        }
        Err(e) => {
            tracing::warn!("Redis unavailable, running without cache: {}", e);
            None
        }
    };

    let identity: SharedIdentityProvider =
        Arc::new(FirebaseIdentityProvider::new(firebase_config)?);

    let mut app = create_app()
        .layer(Extension(db))
        .layer(Extension(identity));

    if let Some(cache) = cache {
        app = app.layer(Extension(cache));
    }

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<(
    config::jwt::JwtConfig,
    config::firebase::FirebaseConfig,
)> {
    let jwt_config = config::jwt::JwtConfig::from_env()?;
    let firebase_config = config::firebase::FirebaseConfig::from_env()?;

    // Checked here for an early error; the connection happens later
    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    if config::admin::AdminConfig::from_env().secret_key.is_none() {
        tracing::warn!("ADMIN_SECRET_KEY not set, admin setup is disabled");
    }

    Ok((jwt_config, firebase_config))
}

fn create_app() -> Router {
    Router::new()
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(
            SecurityHeaders::from_env(),
            security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
