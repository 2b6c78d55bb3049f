// Server configuration loaded from environment variables.
// Decision: No DATABASE_URL means an in-memory store (local development only)
// Decision: GITHUB_WEBHOOK_SECRET is required; the server refuses to start without it

use anyhow::{bail, Context, Result};

use hookfeed_core::hub::DEFAULT_SUBSCRIBER_CAPACITY;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string
    pub database_url: Option<String>,
    /// Shared secret for webhook signatures
    pub webhook_secret: String,
    /// Listen port
    pub port: u16,
    /// Allowed CORS origin
    pub frontend_url: String,
    /// Events buffered per live subscriber before eviction
    pub hub_subscriber_capacity: usize,
    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(webhook_secret) = get("GITHUB_WEBHOOK_SECRET") else {
            bail!("GITHUB_WEBHOOK_SECRET environment variable required");
        };

        let port = match get("BACKEND_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid BACKEND_PORT: {raw}"))?,
            None => DEFAULT_PORT,
        };

        let hub_subscriber_capacity = match get("HUB_SUBSCRIBER_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid HUB_SUBSCRIBER_CAPACITY: {raw}"))?
                .max(1),
            None => DEFAULT_SUBSCRIBER_CAPACITY,
        };

        let run_migrations = get("RUN_MIGRATIONS")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        Ok(Self {
            database_url: get("DATABASE_URL"),
            webhook_secret,
            port,
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            hub_subscriber_capacity,
            run_migrations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("GITHUB_WEBHOOK_SECRET", "s")])).unwrap();

        assert_eq!(config.webhook_secret, "s");
        assert_eq!(config.port, 8080);
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert_eq!(config.hub_subscriber_capacity, 64);
        assert!(config.database_url.is_none());
        assert!(config.run_migrations);
    }

    #[test]
    fn test_secret_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("GITHUB_WEBHOOK_SECRET"));

        assert!(AppConfig::from_lookup(lookup(&[("GITHUB_WEBHOOK_SECRET", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GITHUB_WEBHOOK_SECRET", "s"),
            ("DATABASE_URL", "postgres://localhost/hookfeed"),
            ("BACKEND_PORT", "9090"),
            ("FRONTEND_URL", "https://feed.example.com"),
            ("HUB_SUBSCRIBER_CAPACITY", "8"),
            ("RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/hookfeed")
        );
        assert_eq!(config.port, 9090);
        assert_eq!(config.frontend_url, "https://feed.example.com");
        assert_eq!(config.hub_subscriber_capacity, 8);
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(lookup(&[
            ("GITHUB_WEBHOOK_SECRET", "s"),
            ("BACKEND_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BACKEND_PORT"));
    }
}
