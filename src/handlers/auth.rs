use crate::error::{AppError, AppResult};
use crate::middleware::auth::require_pro;
use crate::middleware::AuthUser;
use crate::models::{AdminModel, UserModel};
use crate::response::ApiResponse;
use crate::services::auth::AuthService;
use crate::services::identity::SharedIdentityProvider;
use crate::utils::text::not_blank;
use crate::extract::ApiJson;
use axum::{response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::timestamp;

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyTokenRequest {
    /// Firebase ID token from the client SDK
    #[serde(default)]
    pub id_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetupAdminRequest {
    #[validate(email)]
    pub email: String,
    /// Must equal the server's admin secret
    #[validate(length(min = 1))]
    pub unique_key: String,
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub unique_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub is_pro: bool,
    pub is_admin: bool,
    pub contribution_count: i32,
    pub contribution_points: i32,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            picture: user.picture,
            is_pro: user.is_pro,
            is_admin: user.is_admin,
            contribution_count: user.contribution_count,
            contribution_points: user.contribution_points,
            last_login_at: user.last_login_at.map(timestamp),
            created_at: timestamp(user.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl From<AdminModel> for AdminResponse {
    fn from(admin: AdminModel) -> Self {
        Self {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            created_at: timestamp(admin.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Session token for `Authorization: Bearer`
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSessionResponse {
    pub token: String,
    pub admin: AdminResponse,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProCheckResponse {
    pub is_pro: bool,
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-token",
    request_body = VerifyTokenRequest,
    responses(
        (status = 200, description = "Token verified, session issued", body = SessionResponse),
        (status = 400, description = "Missing token", body = AppError),
        (status = 401, description = "Invalid token", body = AppError),
        (status = 409, description = "Email belongs to another account", body = AppError),
    ),
    tag = "auth"
)]
pub async fn verify_token(
    Extension(db): Extension<DatabaseConnection>,
    Extension(identity): Extension<SharedIdentityProvider>,
    ApiJson(payload): ApiJson<VerifyTokenRequest>,
) -> AppResult<impl IntoResponse> {
    let id_token = payload.id_token.trim();
    if id_token.is_empty() {
        return Err(AppError::Validation("id_token is required".to_string()));
    }

    let verified = identity.verify_id_token(id_token).await?;
    let (user, token) = AuthService::new(db).sign_in(&verified).await?;

    Ok(ApiResponse::ok(SessionResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Session tokens are stateless; the client drops its copy.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
    ),
    tag = "auth"
)]
pub async fn logout() -> AppResult<impl IntoResponse> {
    Ok(ApiResponse::message("Logged out successfully"))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user = AuthService::new(db).get_user(auth_user.user_id).await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/auth/pro-check",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Caller has Pro access", body = ProCheckResponse),
        (status = 403, description = "Pro access required", body = AppError),
    ),
    tag = "auth"
)]
pub async fn pro_check(auth_user: AuthUser) -> AppResult<impl IntoResponse> {
    require_pro(&auth_user)?;
    Ok(ApiResponse::with_message(
        ProCheckResponse { is_pro: true },
        "Pro access granted",
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/admins",
    responses(
        (status = 200, description = "Administrators, newest first", body = Vec<AdminResponse>),
    ),
    tag = "auth"
)]
pub async fn list_admins(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let admins = AuthService::new(db).list_admins().await?;
    let response: Vec<AdminResponse> = admins.into_iter().map(AdminResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/setup-admin",
    request_body = SetupAdminRequest,
    responses(
        (status = 200, description = "Admin set up", body = AdminResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Wrong admin secret", body = AppError),
    ),
    tag = "auth"
)]
pub async fn setup_admin(
    Extension(db): Extension<DatabaseConnection>,
    ApiJson(payload): ApiJson<SetupAdminRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let admin = AuthService::new(db)
        .setup_admin(&payload.email, &payload.unique_key, &payload.name)
        .await?;

    Ok(ApiResponse::with_message(
        AdminResponse::from(admin),
        "Admin account ready",
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Admin logged in", body = AdminSessionResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn admin_login(
    Extension(db): Extension<DatabaseConnection>,
    ApiJson(payload): ApiJson<AdminLoginRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (admin, user, token) = AuthService::new(db)
        .admin_login(&payload.email, &payload.unique_key)
        .await?;

    Ok(ApiResponse::ok(AdminSessionResponse {
        token,
        admin: AdminResponse::from(admin),
        user: UserResponse::from(user),
    }))
}
