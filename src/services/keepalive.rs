use crate::config::keepalive::KeepAliveConfig;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Ping every configured URL on a fixed interval. Failures are logged and
/// the next round proceeds as usual.
pub fn spawn_keepalive(config: KeepAliveConfig) -> Option<JoinHandle<()>> {
    if !config.enabled || config.targets.is_empty() {
        return None;
    }

    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Keep-alive disabled, HTTP client failed to build: {}", e);
            return None;
        }
    };

    tracing::info!(
        "Keep-alive pinging {} target(s) every {}s",
        config.targets.len(),
        config.interval.as_secs()
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        // The first tick fires immediately; the service was just started.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            for target in &config.targets {
                match http.get(target).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        tracing::debug!("Keep-alive ping to {} ok", target);
                    }
                    Ok(resp) => {
                        tracing::warn!("Keep-alive ping to {} returned {}", target, resp.status());
                    }
                    Err(e) => {
                        tracing::warn!("Keep-alive ping to {} failed: {}", target, e);
                    }
                }
            }
        }
    }))
}
