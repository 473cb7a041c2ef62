use anyhow::Result;
use std::env;

/// Public JWK set used to sign Firebase ID tokens.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub jwks_url: String,
}

impl FirebaseConfig {
    pub fn from_env() -> Result<Self> {
        let project_id = env::var("FIREBASE_PROJECT_ID")
            .map_err(|_| anyhow::anyhow!("FIREBASE_PROJECT_ID environment variable must be set"))?;

        if project_id.trim().is_empty() {
            return Err(anyhow::anyhow!("FIREBASE_PROJECT_ID must not be empty"));
        }

        let jwks_url =
            env::var("FIREBASE_JWKS_URL").unwrap_or_else(|_| FIREBASE_JWKS_URL.to_string());

        Ok(Self {
            project_id: project_id.trim().to_string(),
            jwks_url,
        })
    }

    /// Expected `iss` claim for this project.
    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }
}
