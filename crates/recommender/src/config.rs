//! Recommender tuning configuration
//!
//! Layered with the `config` crate: built-in defaults, then the optional
//! `config/recommender` file, then `RECOMMENDER__*` environment variables
//! (e.g. `RECOMMENDER__CONTENT__SUBSET_LIMIT=2000`).

use marquee_core::{MarqueeError, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub content: ContentConfig,
    pub collaborative: CollaborativeConfig,
    pub api: ApiConfig,
}

/// Text-similarity model settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Items fetched into the content subset (default: 5000)
    pub subset_limit: usize,
    /// Vocabulary cap for the term-weight matrix (default: 5000)
    pub max_features: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            subset_limit: 5000,
            max_features: 5000,
        }
    }
}

/// Rating-matrix projection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollaborativeConfig {
    /// Upper bound on the reduced rank (default: 20)
    pub max_rank: usize,
    /// Extra sketch columns for the randomized decomposition (default: 10)
    pub oversamples: usize,
    /// Power iterations for the randomized decomposition (default: 5)
    pub power_iterations: usize,
    /// Seed for the decomposition's random sketch (default: 42)
    pub seed: u64,
    /// Neighbours consulted by user-based recommendations (default: 20)
    pub neighbourhood: usize,
}

impl Default for CollaborativeConfig {
    fn default() -> Self {
        Self {
            max_rank: 20,
            oversamples: 10,
            power_iterations: 5,
            seed: 42,
            neighbourhood: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Catalog page size (default: 12)
    pub page_size: usize,
    /// Recommendations per request (default: 12)
    pub top_n: usize,
    /// Bearer token for `/api/admin/*`; admin routes refuse every call when unset
    pub admin_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            top_n: 12,
            admin_token: None,
        }
    }
}

impl RecommenderConfig {
    /// Load from `config/recommender` and `RECOMMENDER__*` variables
    pub fn load() -> Result<Self, MarqueeError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/recommender").required(false))
            .add_source(
                config::Environment::with_prefix("RECOMMENDER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?;

        let config: Self = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MarqueeError> {
        let checks = [
            ("content.subset_limit", self.content.subset_limit),
            ("content.max_features", self.content.max_features),
            ("collaborative.max_rank", self.collaborative.max_rank),
            ("collaborative.neighbourhood", self.collaborative.neighbourhood),
            ("api.page_size", self.api.page_size),
            ("api.top_n", self.api.top_n),
        ];

        for (key, value) in checks {
            if value == 0 {
                return Err(MarqueeError::ConfigurationError {
                    message: format!("{} must be greater than 0", key),
                    key: Some(key.to_string()),
                });
            }
        }

        if matches!(self.api.admin_token.as_deref(), Some(token) if token.trim().is_empty()) {
            return Err(MarqueeError::ConfigurationError {
                message: "api.admin_token must not be blank".to_string(),
                key: Some("api.admin_token".to_string()),
            });
        }

        Ok(())
    }
}

fn config_error(err: config::ConfigError) -> MarqueeError {
    MarqueeError::ConfigurationError {
        message: err.to_string(),
        key: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecommenderConfig::default();
        assert_eq!(config.content.subset_limit, 5000);
        assert_eq!(config.content.max_features, 5000);
        assert_eq!(config.collaborative.max_rank, 20);
        assert_eq!(config.collaborative.seed, 42);
        assert_eq!(config.api.page_size, 12);
        assert_eq!(config.api.top_n, 12);
        assert_eq!(config.api.admin_token, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let mut config = RecommenderConfig::default();
        config.api.top_n = 0;

        match config.validate().unwrap_err() {
            MarqueeError::ConfigurationError { key, .. } => {
                assert_eq!(key.as_deref(), Some("api.top_n"))
            }
            other => panic!("Expected ConfigurationError, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_admin_token_rejected() {
        let mut config = RecommenderConfig::default();
        config.api.admin_token = Some("  ".to_string());
        assert!(config.validate().is_err());

        config.api.admin_token = Some("s3cret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: RecommenderConfig =
            serde_json::from_str(r#"{"content": {"subset_limit": 100}}"#).unwrap();
        assert_eq!(config.content.subset_limit, 100);
        assert_eq!(config.content.max_features, 5000);
        assert_eq!(config.collaborative, CollaborativeConfig::default());
    }
}
