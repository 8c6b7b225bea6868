use crate::error::*;
use std::fmt::Display;
use std::time::Duration;
use tracing::{error, info, warn};

/// Stable codes, user-facing text and log helpers for the crate's errors.
pub trait ErrorExt: Display {
    /// Short machine-readable tag, stable across releases.
    fn error_code(&self) -> &'static str;

    fn user_friendly_message(&self) -> String;

    /// How long Reddit asked us to back off, if it said so.
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn log_error(&self) -> &Self
    where
        Self: Sized,
    {
        error!(code = self.error_code(), "{}", self);
        self
    }

    fn log_warn(&self) -> &Self
    where
        Self: Sized,
    {
        warn!(code = self.error_code(), "{}", self);
        self
    }
}

impl ErrorExt for CoreError {
    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API",
            CoreError::Config(_) => "CONFIG",
            CoreError::Io(_) => "IO",
            CoreError::Csv(_) => "CSV",
            CoreError::Network(_) => "NETWORK",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(e) if e.is_timeout() => {
                RedditApiError::RequestTimeout.user_friendly_message()
            }
            CoreError::Network(_) => {
                "Could not reach Reddit. Check your network connection.".to_string()
            }
            CoreError::Io(e) => format!("Could not write output: {}", e),
            CoreError::Csv(e) => format!("Could not write CSV export: {}", e),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            _ => None,
        }
    }
}

impl ErrorExt for RedditApiError {
    fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Auth => "REDDIT_AUTH",
            ErrorKind::RateLimit => "REDDIT_RATE_LIMIT",
            ErrorKind::NotFound => "REDDIT_NOT_FOUND",
            ErrorKind::InvalidUrl => "REDDIT_INVALID_URL",
            _ => "REDDIT_UPSTREAM",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { reason } => format!(
                "Reddit did not accept the app credentials ({}). Check REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET.",
                reason
            ),
            RedditApiError::InvalidToken => {
                "Reddit rejected the access token. Check the app credentials.".to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Reddit is rate limiting this client. Please wait {} seconds before trying again.",
                retry_after
            ),
            RedditApiError::SubredditNotFound { subreddit } => format!(
                "Subreddit '{}' not found, or it is private or banned.",
                subreddit
            ),
            RedditApiError::PostNotFound { post_id } => {
                format!("Post '{}' not found or no longer available.", post_id)
            }
            RedditApiError::InvalidPostUrl { url, .. } => format!(
                "'{}' is not a Reddit post URL. Expected something like https://www.reddit.com/r/<subreddit>/comments/<id>/",
                url
            ),
            RedditApiError::RequestTimeout => {
                "Reddit took too long to answer. Try again in a moment.".to_string()
            }
            RedditApiError::InvalidResponse { .. } | RedditApiError::ServerError { .. } => {
                format!("Reddit returned an unusable response: {}", self)
            }
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }
}

impl ErrorExt for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV",
            ConfigError::FileNotFound { .. } => "CONFIG_FILE",
            ConfigError::Parse(_) => "CONFIG_PARSE",
            ConfigError::InvalidValue { .. } | ConfigError::ValidationFailed { .. } => {
                "CONFIG_INVALID"
            }
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "{} is not set. Export it or add it to a .env file.",
                var_name
            ),
            ConfigError::FileNotFound { path } => format!("Settings file '{}' does not exist.", path),
            ConfigError::Parse(e) => format!("Settings file is not valid TOML: {}", e),
            ConfigError::InvalidValue { .. } | ConfigError::ValidationFailed { .. } => {
                format!("Bad settings: {}", self)
            }
        }
    }
}

/// Turns pipeline errors into one line for the terminal, logging details on the way.
#[derive(Debug, Clone, Copy)]
pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(self, enabled: bool) -> Self {
        Self {
            report_errors: enabled,
            ..self
        }
    }

    pub fn with_warning_reporting(self, enabled: bool) -> Self {
        Self {
            report_warnings: enabled,
            ..self
        }
    }

    pub fn report_error(&self, error: &CoreError) -> String {
        if self.report_errors {
            error.log_error();
            if let Some(wait) = error.retry_after() {
                info!(seconds = wait.as_secs(), "Reddit asked for a back-off");
            }
        }
        error.user_friendly_message()
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
