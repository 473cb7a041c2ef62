use axum::{extract::Extension, middleware, Router};
use nst_buddy::config;
use nst_buddy::middleware::cors::build_cors_layer;
use nst_buddy::middleware::security::{security_headers_middleware, SecurityHeaders};
use nst_buddy::routes;
use nst_buddy::services::identity::{FirebaseIdentityProvider, SharedIdentityProvider};
use nst_buddy::services::keepalive::spawn_keepalive;
use nst_buddy::services::upload::{CloudinaryStore, SharedMediaStore};
use nst_buddy::utils;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    config::logging::init_tracing("nst_buddy=debug,upload_service=debug,tower_http=debug");

    let firebase_config = config::firebase::FirebaseConfig::from_env()?;
    let cloudinary_config = config::cloudinary::CloudinaryConfig::from_env()?;
    tracing::info!("Cloudinary configured: {:?}", cloudinary_config);

    // Session tokens from the main API are accepted when both share JWT_SECRET.
    match config::jwt::JwtConfig::from_env() {
        Ok(jwt_config) => utils::jwt::init_jwt_config(jwt_config)?,
        Err(e) => tracing::warn!("Session tokens not accepted ({}), Firebase tokens only", e),
    }

    let identity: SharedIdentityProvider =
        Arc::new(FirebaseIdentityProvider::new(firebase_config)?);
    let store: SharedMediaStore = Arc::new(CloudinaryStore::new(cloudinary_config)?);

    let app = Router::new()
        .merge(routes::create_upload_routes())
        .layer(middleware::from_fn_with_state(
            SecurityHeaders::from_env(),
            security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .layer(Extension(identity))
        .layer(Extension(store));

    let _keepalive = spawn_keepalive(config::keepalive::KeepAliveConfig::from_env());

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "5001".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Upload service listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}
