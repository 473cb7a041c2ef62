pub mod admin;
pub mod auth;
pub mod campus;
pub mod contribution;
pub mod course;
pub mod health;
pub mod notice;
pub mod question;
pub mod upload;

use crate::services::cache::CacheService;
use crate::services::campus::CampusService;
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;

/// Stored timestamps are naive UTC; clients get RFC 3339.
pub(crate) fn timestamp(at: NaiveDateTime) -> String {
    at.and_utc().to_rfc3339()
}

pub(crate) fn make_campus_service(
    db: DatabaseConnection,
    cache: Option<CacheService>,
) -> CampusService {
    let service = CampusService::new(db);
    match cache {
        Some(c) => service.with_cache(c),
        None => service,
    }
}
