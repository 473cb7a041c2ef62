use crate::config::env_flag;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::env;

// Swagger UI is served from the same origin and needs inline scripts/styles.
const DEFAULT_CSP_POLICY: &str = "default-src 'self'; base-uri 'self'; frame-ancestors 'none'; object-src 'none'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    csp: HeaderValue,
    enable_hsts: bool,
}

impl SecurityHeaders {
    pub fn from_env() -> Self {
        Self::new(env::var("CSP_POLICY").ok().as_deref(), env_flag("ENABLE_HSTS", true))
    }

    pub fn new(csp: Option<&str>, enable_hsts: bool) -> Self {
        let csp = match csp.map(HeaderValue::from_str) {
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                tracing::warn!(
                    "Invalid CSP_POLICY value ({}), falling back to default policy",
                    err
                );
                HeaderValue::from_static(DEFAULT_CSP_POLICY)
            }
            None => HeaderValue::from_static(DEFAULT_CSP_POLICY),
        };

        Self { csp, enable_hsts }
    }
}

pub async fn security_headers_middleware(
    State(config): State<SecurityHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(header::CONTENT_SECURITY_POLICY, config.csp.clone());
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    if config.enable_hsts {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        );
    }

    response
}
