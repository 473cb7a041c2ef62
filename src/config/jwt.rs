use anyhow::Result;
use std::env;

/// Settings for the session tokens this API issues after an identity
/// provider (or admin key login) has vouched for the caller.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub session_token_expiry: u64, // 1 day
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;

        if secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters"
            ));
        }

        let session_token_expiry = env::var("JWT_ACCESS_EXPIRATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86_400);

        Ok(Self {
            secret,
            session_token_expiry,
        })
    }
}
