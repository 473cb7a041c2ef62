use axum::http::{header, HeaderValue, Method};
use std::env;
use tower_http::cors::{Any, CorsLayer};

/// `CORS_ORIGINS` is `*` (default) or a comma-separated origin list.
pub fn build_cors_layer() -> CorsLayer {
    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match parse_origins(&origins_str) {
        Some(origins) => cors.allow_origin(origins),
        None => cors.allow_origin(Any),
    }
}

/// `None` means any origin.
fn parse_origins(raw: &str) -> Option<Vec<HeaderValue>> {
    if raw.trim() == "*" {
        return None;
    }
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_allows_any() {
        assert!(parse_origins("*").is_none());
    }

    #[test]
    fn origin_list_is_split() {
        let origins = parse_origins("https://nstbuddy.app, http://localhost:5173").unwrap();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[1], "http://localhost:5173");
    }
}
