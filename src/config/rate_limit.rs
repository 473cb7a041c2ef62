use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Route groups that get their own token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitGroup {
    /// Identity exchange and admin key login
    Auth,
    /// Anonymous catalogue reads
    PublicRead,
    /// Authenticated writes and admin curation
    Protected,
    /// Multipart uploads on the file service
    Upload,
}

impl RateLimitGroup {
    const ALL: [RateLimitGroup; 4] = [
        RateLimitGroup::Auth,
        RateLimitGroup::PublicRead,
        RateLimitGroup::Protected,
        RateLimitGroup::Upload,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "auth" => Some(Self::Auth),
            "public" | "public_read" | "public-read" => Some(Self::PublicRead),
            "protected" => Some(Self::Protected),
            "upload" | "uploads" => Some(Self::Upload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    rules: [RateLimitRule; 4],
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: [
                RateLimitRule::new(5, 10),
                RateLimitRule::new(30, 60),
                RateLimitRule::new(10, 20),
                RateLimitRule::new(2, 5),
            ],
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = super::env_flag("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_overrides(&raw) {
                Ok(overrides) => {
                    for (group, rule) in overrides {
                        cfg.rules[group.index()] = rule;
                    }
                }
                Err(err) => {
                    tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
                }
            }
        }

        cfg
    }

    pub fn rule(&self, group: RateLimitGroup) -> RateLimitRule {
        self.rules[group.index()]
    }
}

/// `"10:20"` applies to every group; `"auth=5:10,public=30:60"` overrides
/// named groups only.
fn parse_overrides(raw: &str) -> Result<Vec<(RateLimitGroup, RateLimitRule)>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    if !trimmed.contains('=') {
        let rule = parse_rule(trimmed)?;
        return Ok(RateLimitGroup::ALL.iter().map(|g| (*g, rule)).collect());
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (name, raw_rule) = item
                .split_once('=')
                .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
            let group = RateLimitGroup::parse(name.trim()).ok_or_else(|| {
                format!(
                    "unknown group '{}', expected auth/public/protected/upload",
                    name.trim()
                )
            })?;
            Ok((group, parse_rule(raw_rule.trim())?))
        })
        .collect()
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second_raw, burst_raw) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

    let per_second: u64 = per_second_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second_raw.trim()))?;
    let burst_size: u32 = burst_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst_raw.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule::new(per_second, burst_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_rule_covers_every_group() {
        let parsed = parse_overrides("12:24").unwrap();
        assert_eq!(parsed.len(), RateLimitGroup::ALL.len());
        assert!(parsed
            .iter()
            .all(|(_, rule)| *rule == RateLimitRule::new(12, 24)));
    }

    #[test]
    fn grouped_rules_override_named_groups() {
        let parsed = parse_overrides("auth=1:2, upload=3:4").unwrap();
        assert_eq!(
            parsed,
            vec![
                (RateLimitGroup::Auth, RateLimitRule::new(1, 2)),
                (RateLimitGroup::Upload, RateLimitRule::new(3, 4)),
            ]
        );
    }

    #[test]
    fn group_aliases() {
        assert_eq!(
            RateLimitGroup::parse("Public-Read"),
            Some(RateLimitGroup::PublicRead)
        );
        assert_eq!(RateLimitGroup::parse("uploads"), Some(RateLimitGroup::Upload));
        assert_eq!(RateLimitGroup::parse("admin"), None);
    }

    #[test]
    fn zero_rates_rejected() {
        assert!(parse_rule("0:5").is_err());
        assert!(parse_rule("5:0").is_err());
        assert!(parse_overrides("auth=abc").unwrap_err().contains("invalid rule"));
    }

    #[test]
    fn defaults_are_per_group() {
        let cfg = RateLimitConfig::default();
        assert_eq!(cfg.rule(RateLimitGroup::Auth), RateLimitRule::new(5, 10));
        assert_eq!(cfg.rule(RateLimitGroup::Upload), RateLimitRule::new(2, 5));
    }
}
