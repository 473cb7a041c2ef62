use crate::{
    error::{AppError, AppResult},
    models::{User, UserModel},
    services::{auth::AuthService, identity::SharedIdentityProvider},
    utils::jwt::decode_session_token,
};
use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::{DatabaseConnection, EntityTrait};

/// The signed-in user, attached to the request by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub is_admin: bool,
    pub is_pro: bool,
}

impl From<&UserModel> for AuthUser {
    fn from(user: &UserModel) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            is_pro: user.is_pro,
        }
    }
}

/// Authentication middleware for the main API.
///
/// Accepts `Authorization: Bearer <token>` carrying either a session token
/// issued by this API or a provider ID token. Provider tokens for unknown
/// accounts create the user on the fly.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    Extension(identity): Extension<SharedIdentityProvider>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers).ok_or(AppError::Unauthorized)?;

    let user = resolve_user(&db, &identity, &token).await?;
    request.extensions_mut().insert(AuthUser::from(&user));

    Ok(next.run(request).await)
}

async fn resolve_user(
    db: &DatabaseConnection,
    identity: &SharedIdentityProvider,
    token: &str,
) -> AppResult<UserModel> {
    if let Ok(claims) = decode_session_token(token) {
        let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;
        return User::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::Unauthorized);
    }

    let verified = identity.verify_id_token(token).await?;
    AuthService::new(db.clone()).find_or_create(&verified).await
}

/// Caller of the upload service. Resolved without a database.
#[derive(Debug, Clone)]
pub struct Uploader {
    pub email: String,
}

/// Like `auth_middleware`, but only establishes who is calling.
pub async fn uploader_middleware(
    Extension(identity): Extension<SharedIdentityProvider>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers).ok_or(AppError::Unauthorized)?;

    let email = match decode_session_token(&token) {
        Ok(claims) => claims.email,
        Err(_) => identity.verify_id_token(&token).await?.email,
    };
    request.extensions_mut().insert(Uploader { email });

    Ok(next.run(request).await)
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Verify the current user is an admin
pub fn require_admin(auth_user: &AuthUser) -> AppResult<()> {
    if auth_user.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Verify the current user has Pro access
pub fn require_pro(auth_user: &AuthUser) -> AppResult<()> {
    if auth_user.is_pro {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for Uploader
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Uploader>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_extracted() {
        assert_eq!(
            extract_bearer_token(&headers_with("Bearer abc.def.ghi")),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn malformed_authorization_rejected() {
        assert_eq!(extract_bearer_token(&headers_with("Basic Zm9vOmJhcg==")), None);
        assert_eq!(extract_bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn role_guards() {
        let mut user = AuthUser {
            user_id: 1,
            email: "asha@nst.edu".to_string(),
            is_admin: false,
            is_pro: false,
        };
        assert!(matches!(require_admin(&user), Err(AppError::Forbidden)));
        assert!(matches!(require_pro(&user), Err(AppError::Forbidden)));

        user.is_admin = true;
        user.is_pro = true;
        assert!(require_admin(&user).is_ok());
        assert!(require_pro(&user).is_ok());
    }
}
