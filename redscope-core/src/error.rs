use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    RedditApi(#[from] RedditApiError),

    #[error("settings: {0}")]
    Config(#[from] ConfigError),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv export: {0}")]
    Csv(#[from] csv::Error),

    #[error("http transport: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("token request rejected: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("rate limited by reddit, retry in {retry_after}s")]
    RateLimitExceeded { retry_after: u64 },

    #[error("no such subreddit r/{subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("no such post {post_id}")]
    PostNotFound { post_id: String },

    #[error("Invalid post URL '{url}': {reason}")]
    InvalidPostUrl { url: String, reason: String },

    #[error("access token rejected")]
    InvalidToken,

    #[error("request timed out")]
    RequestTimeout,

    #[error("unexpected response body: {details}")]
    InvalidResponse { details: String },

    #[error("reddit answered HTTP {status_code}")]
    ServerError { status_code: u16 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("settings file {path} does not exist")]
    FileNotFound { path: String },

    #[error("{field} = {value:?} is not allowed")]
    InvalidValue { field: String, value: String },

    #[error("{var_name} is not set")]
    MissingEnvironmentVariable { var_name: String },

    #[error("{reason}")]
    ValidationFailed { reason: String },

    #[error("{0}")]
    Parse(#[from] toml::de::Error),
}

impl RedditApiError {
    /// Collapses the upstream-facing variants onto the five failure classes
    /// a caller has to distinguish.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedditApiError::AuthenticationFailed { .. } | RedditApiError::InvalidToken => {
                ErrorKind::Auth
            }
            RedditApiError::RateLimitExceeded { .. } => ErrorKind::RateLimit,
            RedditApiError::SubredditNotFound { .. } | RedditApiError::PostNotFound { .. } => {
                ErrorKind::NotFound
            }
            RedditApiError::InvalidPostUrl { .. } => ErrorKind::InvalidUrl,
            RedditApiError::RequestTimeout
            | RedditApiError::InvalidResponse { .. }
            | RedditApiError::ServerError { .. } => ErrorKind::Upstream,
        }
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::RedditApi(e) => e.kind(),
            CoreError::Config(_) => ErrorKind::Configuration,
            CoreError::Network(_) => ErrorKind::Upstream,
            CoreError::Io(_) | CoreError::Csv(_) => ErrorKind::Output,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Auth,
    NotFound,
    RateLimit,
    InvalidUrl,
    Upstream,
    Output,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}
