use std::env;
use std::time::Duration;

/// Periodic self-ping for hosts that suspend idle services.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub targets: Vec<String>,
}

impl KeepAliveConfig {
    pub fn from_env() -> Self {
        let enabled = super::env_flag("ENABLE_KEEPALIVE", false);

        let interval_secs = env::var("KEEPALIVE_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(13 * 60);

        let self_url = env::var("SELF_URL").ok();
        let extra = env::var("KEEPALIVE_TARGETS").unwrap_or_default();

        Self {
            enabled,
            interval: Duration::from_secs(interval_secs),
            targets: build_targets(self_url.as_deref(), &extra),
        }
    }
}

fn build_targets(self_url: Option<&str>, extra: &str) -> Vec<String> {
    let mut targets = Vec::new();
    if let Some(url) = self_url.map(str::trim).filter(|u| !u.is_empty()) {
        targets.push(format!("{}/health", url.trim_end_matches('/')));
    }
    targets.extend(
        extra
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_url_gets_health_suffix() {
        let targets = build_targets(Some("https://files.example.com/"), "");
        assert_eq!(targets, vec!["https://files.example.com/health"]);
    }

    #[test]
    fn extra_targets_are_split_and_trimmed() {
        let targets = build_targets(None, " https://a.example.com/api , ,https://b.example.com ");
        assert_eq!(
            targets,
            vec!["https://a.example.com/api", "https://b.example.com"]
        );
    }
}
