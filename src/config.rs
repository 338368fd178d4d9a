//! Process configuration read from the environment (after `.env` loading).

use once_cell::sync::Lazy;

static CONFIG: Lazy<ServerConfig> = Lazy::new(ServerConfig::from_env);

/// Where per-session like counters are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeStoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub site_url: String,
    pub site_name: String,
    pub gemini_api_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub newsletter_from: String,
    pub like_store: LikeStoreKind,
    pub like_session_ttl_hours: u64,
    /// Counters the in-memory like store keeps before evicting.
    pub like_memory_capacity: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let site_name = non_empty("SITE_NAME").unwrap_or_else(|| "YuBlog".to_string());
        Self {
            host: non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed("PORT").unwrap_or(3001),
            environment: non_empty("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            site_url: non_empty("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://yourblog.com".to_string()),
            newsletter_from: non_empty("NEWSLETTER_FROM")
                .unwrap_or_else(|| format!("{site_name} <hello@yourblog.com>")),
            site_name,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            resend_api_key: non_empty("RESEND_API_KEY"),
            like_store: match non_empty("LIKE_STORE").as_deref() {
                Some("memory") => LikeStoreKind::Memory,
                _ => LikeStoreKind::Postgres,
            },
            like_session_ttl_hours: parsed("LIKE_SESSION_TTL_HOURS").unwrap_or(24),
            like_memory_capacity: parsed("LIKE_MEMORY_CAPACITY")
                .unwrap_or(crate::engagement::store::DEFAULT_MEMORY_SESSIONS),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    non_empty(key).and_then(|v| v.parse().ok())
}

/// Global configuration, loaded on first access.
pub fn get() -> &'static ServerConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = ServerConfig::from_env();
        assert!(!config.host.is_empty());
        assert!(!config.site_url.ends_with('/'));
        assert!(config.like_session_ttl_hours >= 1);
        assert!(config.like_memory_capacity >= 1);
        assert!(config.newsletter_from.contains('<'));
    }
}
