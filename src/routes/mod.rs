use crate::config::rate_limit::{RateLimitConfig, RateLimitGroup, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::{auth_middleware, uploader_middleware};
use crate::services::upload::MAX_UPLOAD_SIZE;
use axum::{extract::DefaultBodyLimit, middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

/// Headroom for multipart boundaries and the `fileName` field.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_routes() -> Router {
    Router::new()
        .route("/api/health", routing::get(handlers::health::health_check))
        .nest("/api", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let auth = auth_routes(&rate_limit_config);
    let public_read = public_read_routes(&rate_limit_config);
    let protected =
        protected_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    auth.merge(public_read).merge(protected)
}

/// Identity exchange and admin key login.
fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/auth/verify-token",
            routing::post(handlers::auth::verify_token),
        )
        .route("/auth/logout", routing::post(handlers::auth::logout))
        .route(
            "/auth/setup-admin",
            routing::post(handlers::auth::setup_admin),
        )
        .route("/auth/login", routing::post(handlers::auth::admin_login));

    with_optional_rate_limit(router, config.enabled, config.rule(RateLimitGroup::Auth))
}

/// Anonymous catalogue reads.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/admins", routing::get(handlers::auth::list_admins))
        // Campuses
        .route("/campuses", routing::get(handlers::campus::list_campuses))
        .route(
            "/campuses/{slug}",
            routing::get(handlers::campus::get_campus),
        )
        .route(
            "/campuses/{slug}/semesters",
            routing::get(handlers::campus::get_campus_semesters),
        )
        // Questions
        .route(
            "/questions",
            routing::get(handlers::question::list_questions),
        )
        .route(
            "/questions/filters",
            routing::get(handlers::question::get_filters),
        )
        // Contributions
        .route(
            "/contributions/leaderboard",
            routing::get(handlers::contribution::leaderboard),
        )
        // Courses
        .route("/courses", routing::get(handlers::course::list_courses))
        .route("/courses/{id}", routing::get(handlers::course::get_course))
        // Notices
        .route("/notices", routing::get(handlers::notice::list_notices));

    with_optional_rate_limit(
        router,
        config.enabled,
        config.rule(RateLimitGroup::PublicRead),
    )
}

/// Authenticated routes; admin-only ones check the role in the handler.
fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Auth
        .route("/auth/me", routing::get(handlers::auth::get_current_user))
        .route("/auth/pro-check", routing::get(handlers::auth::pro_check))
        // Campuses (admin)
        .route("/campuses", routing::post(handlers::campus::create_campus))
        .route(
            "/campuses/{slug}",
            routing::put(handlers::campus::update_campus)
                .delete(handlers::campus::delete_campus),
        )
        // Questions
        .route(
            "/questions/contribute",
            routing::post(handlers::question::contribute_question),
        )
        .route(
            "/questions",
            routing::post(handlers::question::create_question),
        )
        .route(
            "/questions/{id}",
            routing::put(handlers::question::update_question)
                .delete(handlers::question::delete_question),
        )
        .route(
            "/questions/{id}/approval",
            routing::put(handlers::question::set_question_approval),
        )
        // Contributions
        .route(
            "/contributions/my-stats",
            routing::get(handlers::contribution::my_stats),
        )
        // Courses (admin)
        .route("/courses", routing::post(handlers::course::create_course))
        .route(
            "/courses/{id}",
            routing::put(handlers::course::update_course)
                .delete(handlers::course::delete_course),
        )
        // Notices (admin)
        .route(
            "/notices/all",
            routing::get(handlers::notice::list_all_notices),
        )
        .route("/notices", routing::post(handlers::notice::create_notice))
        .route(
            "/notices/{id}",
            routing::put(handlers::notice::update_notice)
                .delete(handlers::notice::delete_notice),
        )
        // Admin
        .route("/admin/stats", routing::get(handlers::admin::get_stats))
        .route("/admin/users", routing::get(handlers::admin::list_users))
        .route(
            "/admin/users/{id}/pro",
            routing::patch(handlers::admin::set_user_pro),
        )
        .route(
            "/admin/users/{id}/admin",
            routing::patch(handlers::admin::set_user_admin),
        )
        .route(
            "/admin/questions",
            routing::get(handlers::question::list_admin_questions),
        );

    with_optional_rate_limit(
        router,
        config.enabled,
        config.rule(RateLimitGroup::Protected),
    )
}

/// Routes of the standalone upload service.
pub fn create_upload_routes() -> Router {
    let config = RateLimitConfig::from_env();

    let upload = Router::new()
        .route("/api/upload", routing::post(handlers::upload::upload_file))
        .layer(middleware::from_fn(uploader_middleware))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + MULTIPART_OVERHEAD));

    Router::new()
        .route("/health", routing::get(handlers::health::upload_health))
        .merge(with_optional_rate_limit(
            upload,
            config.enabled,
            config.rule(RateLimitGroup::Upload),
        ))
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!("Invalid rate limit rule {:?}, leaving routes unlimited", rule);
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
