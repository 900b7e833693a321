use serde::Deserialize;

use crate::services::recommendations::FailurePolicy;

/// Placeholder shipped in sample env files; treated the same as a missing key
pub const PLACEHOLDER_API_KEY: &str = "YOUR_TMDB_API_KEY";

/// Which profile store backend to construct at startup
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileBackend {
    Memory,
    Redis,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Movie catalog API key
    #[serde(default)]
    pub catalog_api_key: Option<String>,

    /// Movie catalog API base URL
    #[serde(default = "default_catalog_api_url")]
    pub catalog_api_url: String,

    /// Base URL that poster/backdrop path fragments are resolved against
    #[serde(default = "default_catalog_image_base_url")]
    pub catalog_image_base_url: String,

    /// Per-request timeout for catalog calls, in seconds
    #[serde(default = "default_catalog_timeout_secs")]
    pub catalog_timeout_secs: u64,

    /// Profile store backend
    #[serde(default = "default_profile_store")]
    pub profile_store: ProfileBackend,

    /// Redis connection URL (used by the redis profile store)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Shuffle the "Recommended for You" pool
    #[serde(default = "default_shuffle_recommendations")]
    pub shuffle_recommendations: bool,

    /// Fixed seed for the recommendation shuffle
    #[serde(default)]
    pub recommendation_seed: Option<u64>,

    /// How the feed reacts to a failing section
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_catalog_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_catalog_timeout_secs() -> u64 {
    10
}

fn default_profile_store() -> ProfileBackend {
    ProfileBackend::Memory
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_shuffle_recommendations() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Returns true when the key is present and not the sample placeholder
pub fn is_api_key_usable(api_key: Option<&str>) -> bool {
    match api_key.map(str::trim) {
        Some(key) => !key.is_empty() && key != PLACEHOLDER_API_KEY,
        None => false,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Whether catalog calls can be made at all
    pub fn is_catalog_configured(&self) -> bool {
        is_api_key_usable(self.catalog_api_key.as_deref())
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(vars: Vec<(&str, &str)>) -> Config {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(vec![]);
        assert_eq!(config.catalog_api_key, None);
        assert_eq!(config.catalog_api_url, "https://api.themoviedb.org/3");
        assert_eq!(config.catalog_timeout_secs, 10);
        assert_eq!(config.profile_store, ProfileBackend::Memory);
        assert!(config.shuffle_recommendations);
        assert_eq!(config.recommendation_seed, None);
        assert_eq!(config.failure_policy, FailurePolicy::PerSection);
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert!(!config.is_catalog_configured());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(vec![
            ("CATALOG_API_KEY", "abc123"),
            ("PROFILE_STORE", "redis"),
            ("RECOMMENDATION_SEED", "42"),
            ("FAILURE_POLICY", "all_or_fallback"),
            ("PORT", "8080"),
        ]);
        assert!(config.is_catalog_configured());
        assert_eq!(config.profile_store, ProfileBackend::Redis);
        assert_eq!(config.recommendation_seed, Some(42));
        assert_eq!(config.failure_policy, FailurePolicy::AllOrFallback);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_placeholder_key_is_not_configured() {
        assert!(!is_api_key_usable(Some(PLACEHOLDER_API_KEY)));
        assert!(!is_api_key_usable(Some("   ")));
        assert!(!is_api_key_usable(None));
        assert!(is_api_key_usable(Some("f03c1dc8")));
    }
}
