//! Credential loading and the optional TOML settings file.
//!
//! Secrets only ever come from the environment (optionally seeded from a
//! `.env` file); everything else has a default that `redscope.toml` may
//! override.

use crate::error::{ConfigError, CoreError};
use crate::types::{SortMode, TimeFilter};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const CLIENT_ID_VAR: &str = "REDDIT_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "REDDIT_CLIENT_SECRET";
pub const USER_AGENT_VAR: &str = "REDDIT_USER_AGENT";
pub const USERNAME_VAR: &str = "REDDIT_USERNAME";

pub const DEFAULT_SETTINGS_FILE: &str = "redscope.toml";

/// Upper bound for histogram bucket counts, from settings or the command line.
pub const MAX_BUCKETS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub username: Option<String>,
}

impl Credentials {
    /// Reads credentials from the process environment, loading `.env` first
    /// when one exists in the working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("could not read .env file: {}", e),
                })
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            non_empty(lookup(key)).ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: key.to_string(),
            })
        };

        let credentials = Self {
            client_id: required(CLIENT_ID_VAR)?,
            client_secret: required(CLIENT_SECRET_VAR)?,
            user_agent: required(USER_AGENT_VAR)?,
            username: non_empty(lookup(USERNAME_VAR)),
        };

        debug!(
            "Loaded Reddit credentials for client id {} (username: {})",
            credentials.client_id,
            credentials.username.as_deref().unwrap_or("none")
        );
        Ok(credentials)
    }

    /// User agent sent upstream: `<agent> (by /u/<username>)` when a username
    /// is configured and not already part of the agent string.
    pub fn effective_user_agent(&self) -> String {
        match &self.username {
            Some(username) if !self.user_agent.contains(username.as_str()) => {
                format!("{} (by /u/{})", self.user_agent, username)
            }
            _ => self.user_agent.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reddit: RedditSettings,
    pub scrape: ScrapeSettings,
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    pub auth_base_url: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Maximum number of "more comments" stubs resolved per post; `None`
    /// resolves every stub.
    pub more_comments_limit: Option<usize>,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            auth_base_url: "https://www.reddit.com".to_string(),
            api_base_url: "https://oauth.reddit.com".to_string(),
            request_timeout_secs: 30,
            more_comments_limit: Some(32),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub default_limit: usize,
    pub default_sort: SortMode,
    pub default_time_filter: TimeFilter,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            default_limit: 25,
            default_sort: SortMode::Hot,
            default_time_filter: TimeFilter::Month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub positive_threshold: f64,
    pub negative_threshold: f64,
    pub extra_stopwords: Vec<String>,
    pub top_n: usize,
    pub bucket_count: usize,
    pub max_words: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            positive_threshold: 0.1,
            negative_threshold: -0.1,
            extra_stopwords: Vec::new(),
            top_n: 10,
            bucket_count: 10,
            max_words: 200,
        }
    }
}

impl AppConfig {
    /// Loads settings from `path`, or from `redscope.toml` in the working
    /// directory when no path is given. Only an explicitly named file has to
    /// exist.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let (path, explicit) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_SETTINGS_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;
        if !(-1.0..=1.0).contains(&analysis.negative_threshold)
            || !(-1.0..=1.0).contains(&analysis.positive_threshold)
        {
            return Err(ConfigError::ValidationFailed {
                reason: "sentiment thresholds must lie within [-1, 1]".to_string(),
            });
        }
        if analysis.negative_threshold > analysis.positive_threshold {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "negative_threshold ({}) is above positive_threshold ({})",
                    analysis.negative_threshold, analysis.positive_threshold
                ),
            });
        }
        if !(1..=MAX_BUCKETS).contains(&analysis.bucket_count) {
            return Err(ConfigError::InvalidValue {
                field: "analysis.bucket_count".to_string(),
                value: analysis.bucket_count.to_string(),
            });
        }
        if self.reddit.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reddit.request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
            (USER_AGENT_VAR, "redscope/0.1"),
        ]
    }

    #[test]
    fn test_credentials_loaded() {
        let creds = Credentials::from_lookup(lookup_from(&full_env())).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.client_secret, "secret");
        assert_eq!(creds.user_agent, "redscope/0.1");
        assert_eq!(creds.username, None);
    }

    #[test]
    fn test_missing_credential_is_reported_by_name() {
        let env: Vec<_> = full_env()
            .into_iter()
            .filter(|(k, _)| *k != CLIENT_SECRET_VAR)
            .collect();
        let err = Credentials::from_lookup(lookup_from(&env)).unwrap_err();
        match err {
            ConfigError::MissingEnvironmentVariable { var_name } => {
                assert_eq!(var_name, CLIENT_SECRET_VAR)
            }
            other => panic!("Expected MissingEnvironmentVariable, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let mut env = full_env();
        env[0] = (CLIENT_ID_VAR, "   ");
        assert!(Credentials::from_lookup(lookup_from(&env)).is_err());
    }

    #[test]
    fn test_loading_is_repeatable() {
        let env = full_env();
        let first = Credentials::from_lookup(lookup_from(&env)).unwrap();
        let second = Credentials::from_lookup(lookup_from(&env)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_effective_user_agent() {
        let mut env = full_env();
        env.push((USERNAME_VAR, "spez"));
        let creds = Credentials::from_lookup(lookup_from(&env)).unwrap();
        assert_eq!(creds.effective_user_agent(), "redscope/0.1 (by /u/spez)");

        let creds = Credentials {
            user_agent: "redscope/0.1 by spez".to_string(),
            ..creds
        };
        assert_eq!(creds.effective_user_agent(), "redscope/0.1 by spez");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [scrape]
            default_sort = "top"

            [analysis]
            positive_threshold = 0.0
            negative_threshold = 0.0
            extra_stopwords = ["lol"]
            "#,
        )
        .unwrap();

        assert_eq!(config.scrape.default_sort, SortMode::Top);
        assert_eq!(config.scrape.default_limit, 25);
        assert_eq!(config.analysis.positive_threshold, 0.0);
        assert_eq!(config.analysis.extra_stopwords, vec!["lol".to_string()]);
        assert_eq!(config.reddit, RedditSettings::default());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = AppConfig::from_toml_str(
            r#"
            [analysis]
            positive_threshold = -0.2
            negative_threshold = 0.2
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));
    }

    #[test]
    fn test_bucket_count_must_be_bounded() {
        for raw in ["[analysis]\nbucket_count = 0", "[analysis]\nbucket_count = 1000000000"] {
            let err = AppConfig::from_toml_str(raw).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { field, .. } if field == "analysis.bucket_count"),
                "unexpected error for {:?}: {}",
                raw,
                err
            );
        }

        let config = AppConfig::from_toml_str("[analysis]\nbucket_count = 500").unwrap();
        assert_eq!(config.analysis.bucket_count, MAX_BUCKETS);
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = AppConfig::from_toml_str("[scrape\ndefault_limit = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = AppConfig::from_toml_str("[scrape]\ndefault_sort = \"best\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
