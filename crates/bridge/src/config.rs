use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_GRAPH_BASE: &str = "https://graph.facebook.com/v20.0";
pub const DEFAULT_SPOND_BASE: &str = "https://api.spond.com/core/v1";

/// WhatsApp Cloud API credentials.
#[derive(Clone)]
pub struct WhatsAppConfig {
    pub token: String,
    pub phone_id: String,
    pub graph_base: String,
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("token", &"<redacted>")
            .field("phone_id", &self.phone_id)
            .field("graph_base", &self.graph_base)
            .finish()
    }
}

/// Spond account used to read events and write responses.
#[derive(Clone)]
pub struct SpondConfig {
    pub username: String,
    pub password: String,
    pub base_url: String,
}

impl std::fmt::Debug for SpondConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpondConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_path: String,
    pub verify_token: String,
    pub days_ahead: u32,
    pub whatsapp: WhatsAppConfig,
    pub spond: SpondConfig,
    /// `None` leaves the background invite poller off.
    pub invite_poll_interval: Option<Duration>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `WABA_TOKEN`, `WABA_PHONE_ID`: WhatsApp Cloud API credentials
    /// - `SPOND_USER`, `SPOND_PASS`: Spond login
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| get(key).with_context(|| format!("{} must be set", key));

        Ok(Self {
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            database_path: get("DB_PATH").unwrap_or_else(|| "app.db".to_string()),
            verify_token: get("VERIFY_TOKEN").unwrap_or_else(|| "my-secret".to_string()),
            days_ahead: get("DAYS_AHEAD")
                .unwrap_or_else(|| "14".to_string())
                .parse()
                .context("DAYS_AHEAD must be a valid number")?,
            whatsapp: WhatsAppConfig {
                token: require("WABA_TOKEN")?,
                phone_id: require("WABA_PHONE_ID")?,
                graph_base: get("GRAPH_BASE").unwrap_or_else(|| DEFAULT_GRAPH_BASE.to_string()),
            },
            spond: SpondConfig {
                username: require("SPOND_USER")?,
                password: require("SPOND_PASS")?,
                base_url: get("SPOND_BASE").unwrap_or_else(|| DEFAULT_SPOND_BASE.to_string()),
            },
            invite_poll_interval: get("INVITE_POLL_INTERVAL_SECS")
                .map(|s| s.parse::<u64>())
                .transpose()
                .context("INVITE_POLL_INTERVAL_SECS must be a valid number")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("WABA_TOKEN", "token"),
        ("WABA_PHONE_ID", "12345"),
        ("SPOND_USER", "coach@example.com"),
        ("SPOND_PASS", "hunter2"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_source(source(&REQUIRED)).expect("should load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, "app.db");
        assert_eq!(config.verify_token, "my-secret");
        assert_eq!(config.days_ahead, 14);
        assert_eq!(config.whatsapp.graph_base, DEFAULT_GRAPH_BASE);
        assert_eq!(config.spond.base_url, DEFAULT_SPOND_BASE);
        assert!(config.invite_poll_interval.is_none());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = AppConfig::from_source(source(&REQUIRED[..3])).unwrap_err();
        assert!(err.to_string().contains("SPOND_PASS"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "3000"),
            ("DAYS_AHEAD", "7"),
            ("INVITE_POLL_INTERVAL_SECS", "3600"),
        ]);
        let config = AppConfig::from_source(source(&pairs)).expect("should load");
        assert_eq!(config.port, 3000);
        assert_eq!(config.days_ahead, 7);
        assert_eq!(config.invite_poll_interval, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let config = AppConfig::from_source(source(&REQUIRED)).expect("should load");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
