use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::env;
use std::time::Duration;

/// Connection pool sizing for the PostgreSQL pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub log_statements: bool,
}

impl PoolSettings {
    pub fn from_env() -> Self {
        let max_connections = parse_count("DB_MAX_CONNECTIONS").unwrap_or(10);
        // The minimum never exceeds the maximum.
        let min_connections = parse_count("DB_MIN_CONNECTIONS")
            .unwrap_or(2)
            .min(max_connections);

        Self {
            max_connections,
            min_connections,
            log_statements: super::env_flag("DB_LOG_STATEMENTS", false),
        }
    }
}

fn parse_count(var_name: &str) -> Option<u32> {
    env::var(var_name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|n: &u32| *n > 0)
}

pub async fn get_database() -> Result<DatabaseConnection, DbErr> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| DbErr::Custom("DATABASE_URL must be set".to_string()))?;

    let pool = PoolSettings::from_env();
    tracing::debug!(
        max = pool.max_connections,
        min = pool.min_connections,
        "Configuring database pool"
    );

    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(pool.log_statements);

    Database::connect(opt).await
}
