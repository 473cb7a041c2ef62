use crate::config::firebase::FirebaseConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const DEFAULT_KEYS_MAX_AGE: u64 = 3600;
/// Minimum spacing between key-set downloads triggered by an unknown `kid`.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Identity vouched for by an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Verifies third-party ID tokens. Production uses Firebase; tests swap in a
/// static implementation.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> AppResult<VerifiedIdentity>;
}

pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Verifies Firebase ID tokens against Google's published JWK set.
pub struct FirebaseIdentityProvider {
    config: FirebaseConfig,
    http: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
    refresh: Mutex<()>,
}

impl FirebaseIdentityProvider {
    pub fn new(config: FirebaseConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            config,
            http,
            keys: RwLock::new(None),
            refresh: Mutex::new(()),
        })
    }

    async fn decoding_key(&self, kid: &str) -> AppResult<DecodingKey> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        // One download at a time; whoever waited re-reads what it fetched.
        let _refresh = self.refresh.lock().await;
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        // Stale cache or rotated signing key.
        let fresh = self.fetch_keys().await?;
        let key = fresh.set.find(kid).map(DecodingKey::from_jwk).transpose()?;
        *self.keys.write().await = Some(fresh);

        key.ok_or_else(|| {
            tracing::debug!("Firebase token signed with unknown kid {}", kid);
            AppError::Unauthorized
        })
    }

    /// `Ok(None)` means the caller should download the key set again.
    async fn cached_key(&self, kid: &str) -> AppResult<Option<DecodingKey>> {
        let now = Instant::now();
        let cached = self.keys.read().await;
        let Some(keys) = cached.as_ref().filter(|k| k.is_fresh(now)) else {
            return Ok(None);
        };

        if let Some(jwk) = keys.set.find(kid) {
            return Ok(Some(DecodingKey::from_jwk(jwk)?));
        }
        if refresh_allowed(keys.fetched_at, now) {
            return Ok(None);
        }

        tracing::debug!("Unknown kid {} within refresh interval", kid);
        Err(AppError::Unauthorized)
    }

    async fn fetch_keys(&self) -> AppResult<CachedKeys> {
        let response = self
            .http
            .get(&self.config.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::BadGateway(format!("Failed to fetch Firebase keys: {}", e)))?;

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEYS_MAX_AGE);

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AppError::BadGateway(format!("Invalid Firebase key set: {}", e)))?;

        tracing::info!(
            "Fetched {} Firebase signing keys (max-age {}s)",
            set.keys.len(),
            max_age
        );

        let fetched_at = Instant::now();
        Ok(CachedKeys {
            set,
            fetched_at,
            expires_at: fetched_at + Duration::from_secs(max_age),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> AppResult<VerifiedIdentity> {
        let header = decode_header(id_token).map_err(|_| AppError::Unauthorized)?;
        if header.alg != Algorithm::RS256 {
            return Err(AppError::Unauthorized);
        }
        let kid = header.kid.ok_or(AppError::Unauthorized)?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.config.project_id]);
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);

        let data = decode::<FirebaseClaims>(id_token, &key, &validation).map_err(|e| {
            tracing::debug!("Firebase token rejected: {}", e);
            AppError::Unauthorized
        })?;

        into_identity(data.claims)
    }
}

fn into_identity(claims: FirebaseClaims) -> AppResult<VerifiedIdentity> {
    let uid = claims.sub.trim().to_string();
    if uid.is_empty() {
        return Err(AppError::Unauthorized);
    }

    // Every account row is keyed by email; phone-only sign-ins have none.
    let email = claims
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or(AppError::Unauthorized)?;

    Ok(VerifiedIdentity {
        uid,
        email,
        email_verified: claims.email_verified,
        name: claims.name.filter(|n| !n.trim().is_empty()),
        picture: claims.picture.filter(|p| !p.trim().is_empty()),
    })
}

/// Whether a fresh key set fetched at `fetched_at` may be replaced because a
/// token names a `kid` it lacks.
fn refresh_allowed(fetched_at: Instant, now: Instant) -> bool {
    now.saturating_duration_since(fetched_at) >= MIN_REFRESH_INTERVAL
}

/// Extract `max-age` seconds from a `Cache-Control` header value.
fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, email: Option<&str>) -> FirebaseClaims {
        FirebaseClaims {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            email_verified: true,
            name: Some("Asha".to_string()),
            picture: Some(String::new()),
        }
    }

    #[test]
    fn max_age_from_google_header() {
        assert_eq!(
            parse_max_age("public, max-age=22403, must-revalidate, no-transform"),
            Some(22403)
        );
    }

    #[test]
    fn max_age_missing_or_invalid() {
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=soon"), None);
    }

    #[test]
    fn identity_requires_email() {
        assert!(matches!(
            into_identity(claims("uid-1", None)),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            into_identity(claims("uid-1", Some("  "))),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn identity_requires_subject() {
        assert!(matches!(
            into_identity(claims(" ", Some("a@nst.edu"))),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn empty_picture_is_dropped() {
        let identity = into_identity(claims("uid-1", Some("a@nst.edu"))).unwrap();
        assert_eq!(identity.uid, "uid-1");
        assert_eq!(identity.email, "a@nst.edu");
        assert_eq!(identity.name.as_deref(), Some("Asha"));
        assert_eq!(identity.picture, None);
        assert!(identity.email_verified);
    }

    #[test]
    fn missing_email_verified_claim_means_unverified() {
        let claims: FirebaseClaims =
            serde_json::from_str(r#"{"sub":"uid-1","email":"a@nst.edu"}"#).unwrap();
        let identity = into_identity(claims).unwrap();
        assert!(!identity.email_verified);
    }

    #[test]
    fn unknown_kid_refresh_is_throttled() {
        let fetched_at = Instant::now();
        assert!(!refresh_allowed(fetched_at, fetched_at));
        assert!(!refresh_allowed(fetched_at, fetched_at + Duration::from_secs(59)));
        assert!(refresh_allowed(fetched_at, fetched_at + MIN_REFRESH_INTERVAL));
    }

    fn provider() -> FirebaseIdentityProvider {
        FirebaseIdentityProvider::new(FirebaseConfig {
            project_id: "nst-buddy".to_string(),
            jwks_url: "http://127.0.0.1:9/unreachable".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn recently_fetched_keys_answer_unknown_kid_without_download() {
        let provider = provider();
        let now = Instant::now();
        *provider.keys.write().await = Some(CachedKeys {
            set: JwkSet { keys: Vec::new() },
            fetched_at: now,
            expires_at: now + Duration::from_secs(3600),
        });

        // The key URL is unreachable, so a download would surface as 502.
        for _ in 0..5 {
            assert!(matches!(
                provider.decoding_key("rotated-kid").await,
                Err(AppError::Unauthorized)
            ));
        }
    }

    #[tokio::test]
    async fn expired_keys_are_downloaded_again() {
        let provider = provider();
        let now = Instant::now();
        *provider.keys.write().await = Some(CachedKeys {
            set: JwkSet { keys: Vec::new() },
            fetched_at: now,
            expires_at: now,
        });

        assert!(matches!(
            provider.decoding_key("rotated-kid").await,
            Err(AppError::BadGateway(_))
        ));
    }

    #[tokio::test]
    async fn malformed_token_is_unauthorized() {
        let provider = provider();
        assert!(matches!(
            provider.verify_id_token("definitely-not-a-jwt").await,
            Err(AppError::Unauthorized)
        ));
    }
}
