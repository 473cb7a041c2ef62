pub mod admin;
pub mod cloudinary;
pub mod database;
pub mod firebase;
pub mod jwt;
pub mod keepalive;
pub mod logging;
pub mod rate_limit;
pub mod redis;

use std::env;

/// Read a boolean flag such as `RATE_LIMIT_ENABLED=yes`.
/// Unset or unrecognised values fall back to `default`.
pub fn env_flag(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .and_then(|value| parse_flag(&value))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
