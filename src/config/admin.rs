use std::env;
use subtle::ConstantTimeEq;

/// Shared secret required by `POST /auth/setup-admin`.
#[derive(Clone)]
pub struct AdminConfig {
    pub secret_key: Option<String>,
}

impl AdminConfig {
    pub fn from_env() -> Self {
        let secret_key = env::var("ADMIN_SECRET_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Self { secret_key }
    }

    /// An unset secret rejects every key.
    pub fn accepts(&self, candidate: &str) -> bool {
        match &self.secret_key {
            Some(secret) => secret.as_bytes().ct_eq(candidate.as_bytes()).into(),
            None => false,
        }
    }
}
