#![allow(dead_code)]

use async_trait::async_trait;
use nst_buddy::error::{AppError, AppResult};
use nst_buddy::services::identity::{IdentityProvider, SharedIdentityProvider, VerifiedIdentity};
use nst_buddy::services::upload::{MediaStore, SharedMediaStore, StoredMedia, UploadedFile};
use reqwest::Client;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex as StdMutex, Once,
};
use tokio::sync::{Mutex, MutexGuard};

pub const ADMIN_SECRET: &str = "integration-admin-secret";

static INIT: Once = Once::new();
static MIGRATIONS_RAN: AtomicBool = AtomicBool::new(false);
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);
// Tests in one binary share the database; truncation must not interleave.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("ADMIN_SECRET_KEY", ADMIN_SECRET);
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = nst_buddy::config::jwt::JwtConfig::from_env().unwrap();
        let _ = nst_buddy::utils::jwt::init_jwt_config(config);
    });
}

/// Accepts `test-token:<uid>:<email>:<name>` for a verified email and
/// `test-token-unverified:...` for an unverified one.
pub struct StaticIdentityProvider;

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> AppResult<VerifiedIdentity> {
        let mut parts = id_token.splitn(4, ':');
        let email_verified = match parts.next() {
            Some("test-token") => true,
            Some("test-token-unverified") => false,
            _ => return Err(AppError::Unauthorized),
        };
        match (parts.next(), parts.next(), parts.next()) {
            (Some(uid), Some(email), name) if !uid.is_empty() => Ok(VerifiedIdentity {
                uid: uid.to_string(),
                email: email.to_string(),
                email_verified,
                name: name.filter(|n| !n.is_empty()).map(str::to_string),
                picture: None,
            }),
            _ => Err(AppError::Unauthorized),
        }
    }
}

pub fn id_token(uid: &str, email: &str, name: &str) -> String {
    format!("test-token:{}:{}:{}", uid, email, name)
}

pub fn unverified_id_token(uid: &str, email: &str, name: &str) -> String {
    format!("test-token-unverified:{}:{}:{}", uid, email, name)
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
    _guard: MutexGuard<'static, ()>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.addr, path)
    }
}

pub async fn spawn_app() -> TestApp {
    init_env();
    let guard = DB_LOCK.lock().await;

    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    if !MIGRATIONS_RAN.swap(true, Ordering::SeqCst) {
        nst_buddy::migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
    }

    reset_tables(&db).await;

    let identity: SharedIdentityProvider = Arc::new(StaticIdentityProvider);

    let app = axum::Router::new()
        .merge(nst_buddy::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(identity));

    let addr = serve(app).await;

    TestApp {
        addr,
        db,
        client: Client::new(),
        _guard: guard,
    }
}

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{}", addr)
}

async fn reset_tables(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        sea_orm::DatabaseBackend::Postgres,
        "TRUNCATE TABLE questions, notices, courses, admins, users, campuses RESTART IDENTITY CASCADE"
            .to_string(),
    ))
    .await
    .expect("Failed to truncate tables");

    db.execute(Statement::from_string(
        sea_orm::DatabaseBackend::Postgres,
        "INSERT INTO campuses (name, slug, description, image_url, is_active) VALUES
         ('Delhi NCR', 'delhi-ncr', 'Delhi NCR Campus', '/nst-delhi.png', TRUE),
         ('Pune', 'pune', 'Pune Campus', '/nst-pune.png', TRUE),
         ('Bangalore', 'bangalore', 'Bangalore Campus', '/nst-bangalore.png', TRUE)"
            .to_string(),
    ))
    .await
    .expect("Failed to seed campuses");
}

/// Sign in through the identity exchange; returns (user_id, session token, email).
pub async fn login_user(app: &TestApp, prefix: &str) -> (i32, String, String) {
    let counter = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let uid = format!("{}-uid-{}", prefix, counter);
    let email = format!("{}{}@test.com", prefix, counter);

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({ "id_token": id_token(&uid, &email, prefix) }))
        .send()
        .await
        .expect("Failed to call verify-token");

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.expect("Failed to parse response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to sign in '{}': status={}, body={}", email, status, body);
    }

    let user_id = body["data"]["user"]["id"]
        .as_i64()
        .expect("Response missing user id") as i32;
    let token = body["data"]["token"]
        .as_str()
        .expect("Response missing token")
        .to_string();
    (user_id, token, email)
}

/// Make a user admin by directly updating the database.
pub async fn make_admin(db: &DatabaseConnection, user_id: i32) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE users SET is_admin = TRUE WHERE id = $1",
        vec![user_id.into()],
    ))
    .await
    .expect("Failed to make user admin");
}

pub async fn make_pro(db: &DatabaseConnection, user_id: i32) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE users SET is_pro = TRUE WHERE id = $1",
        vec![user_id.into()],
    ))
    .await
    .expect("Failed to make user pro");
}

/// Sign in a fresh user and promote it; returns (user_id, token).
pub async fn login_admin(app: &TestApp) -> (i32, String) {
    let (user_id, token, _) = login_user(app, "admin").await;
    make_admin(&app.db, user_id).await;
    (user_id, token)
}

/// Contribute a question as `token` and return the question id.
pub async fn contribute(app: &TestApp, token: &str, campus: &str, name: &str) -> i32 {
    let resp = app
        .client
        .post(app.url("/questions/contribute"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "campus_slug": campus,
            "semester": 3,
            "question_name": name,
            "subject": "DSA",
            "topic": "Arrays",
            "link": "https://leetcode.com/problems/two-sum/"
        }))
        .send()
        .await
        .expect("Failed to contribute");

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.expect("Failed to parse response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to contribute '{}': status={}, body={}", name, status, body);
    }

    body["data"]["question"]["id"]
        .as_i64()
        .expect("Response missing question id") as i32
}

/// Remembers every upload instead of talking to a media host.
#[derive(Default)]
pub struct RecordingMediaStore {
    pub uploads: StdMutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl MediaStore for RecordingMediaStore {
    async fn store(&self, file: &UploadedFile, uploader_email: &str) -> AppResult<StoredMedia> {
        self.uploads.lock().unwrap().push((
            file.file_name.clone(),
            uploader_email.to_string(),
            file.data.len(),
        ));
        Ok(StoredMedia {
            url: format!("https://media.test/{}", file.file_name),
            public_id: format!("nst-buddy/{}", file.file_name),
            format: Some("pdf".to_string()),
            bytes: file.data.len() as u64,
            uploaded_at: "2024-01-01T00:00:00Z".to_string(),
        })
    }
}

pub struct UploadApp {
    pub addr: String,
    pub client: Client,
    pub store: Arc<RecordingMediaStore>,
}

impl UploadApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

/// The upload service needs no database.
pub async fn spawn_upload_app() -> UploadApp {
    init_env();

    let identity: SharedIdentityProvider = Arc::new(StaticIdentityProvider);
    let store = Arc::new(RecordingMediaStore::default());
    let shared: SharedMediaStore = store.clone();

    let app = axum::Router::new()
        .merge(nst_buddy::routes::create_upload_routes())
        .layer(axum::extract::Extension(identity))
        .layer(axum::extract::Extension(shared));

    UploadApp {
        addr: serve(app).await,
        client: Client::new(),
        store,
    }
}
