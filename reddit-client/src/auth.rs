//! Application-only OAuth2 against Reddit's token endpoint.
//!
//! Reddit issues bearer tokens for script apps through the client-credentials
//! grant. The exchange runs through our own `reqwest` client so the request
//! carries the configured user agent, which Reddit requires.

use crate::api::REDDIT_API_BASE;
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError, TokenResponse,
    TokenUrl,
};
use redscope_core::{AppConfig, ConfigError, CoreError, Credentials, RedditApiError, TimeFilter};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

pub const REDDIT_AUTH_BASE: &str = "https://www.reddit.com";

/// Tokens are treated as expired this long before upstream says so.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub auth_base_url: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub more_comments_limit: Option<usize>,
    pub time_filter: TimeFilter,
}

impl RedditOAuth2Config {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
            auth_base_url: REDDIT_AUTH_BASE.to_string(),
            api_base_url: REDDIT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(30),
            more_comments_limit: Some(32),
            time_filter: TimeFilter::Month,
        }
    }

    pub fn from_settings(credentials: &Credentials, settings: &AppConfig) -> Self {
        Self {
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            user_agent: credentials.effective_user_agent(),
            auth_base_url: settings.reddit.auth_base_url.clone(),
            api_base_url: settings.reddit.api_base_url.clone(),
            request_timeout: Duration::from_secs(settings.reddit.request_timeout_secs),
            more_comments_limit: settings.reddit.more_comments_limit,
            time_filter: settings.scrape.default_time_filter,
        }
    }

    pub fn with_base_urls(mut self, auth_base_url: &str, api_base_url: &str) -> Self {
        self.auth_base_url = auth_base_url.to_string();
        self.api_base_url = api_base_url.to_string();
        self
    }

    pub fn with_more_comments_limit(mut self, limit: Option<usize>) -> Self {
        self.more_comments_limit = limit;
        self
    }

    pub fn with_time_filter(mut self, time_filter: TimeFilter) -> Self {
        self.time_filter = time_filter;
        self
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/api/v1/authorize", self.auth_base_url.trim_end_matches('/'))
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/api/v1/access_token",
            self.auth_base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    TokenExpired { token: RedditToken },
}

pub(crate) struct TokenExchanger {
    oauth_client: BasicClient,
    http_client: reqwest::Client,
}

impl TokenExchanger {
    pub(crate) fn new(config: &RedditOAuth2Config) -> Result<Self, CoreError> {
        let invalid_base = |e: url::ParseError| {
            CoreError::Config(ConfigError::InvalidValue {
                field: "reddit.auth_base_url".to_string(),
                value: format!("{} ({})", config.auth_base_url, e),
            })
        };

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(config.authorize_url()).map_err(invalid_base)?,
            Some(TokenUrl::new(config.token_url()).map_err(invalid_base)?),
        );

        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            oauth_client,
            http_client,
        })
    }

    pub(crate) async fn request_token(&self) -> Result<RedditToken, CoreError> {
        debug!("Requesting application-only access token");
        let response = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(|request| send_oauth_request(&self.http_client, request))
            .await
            .map_err(token_error)?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        info!("Obtained Reddit access token valid for {:?}", lifetime);
        Ok(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope,
        })
    }
}

async fn send_oauth_request(
    http_client: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http_client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn token_error(err: RequestTokenError<reqwest::Error, BasicErrorResponse>) -> CoreError {
    match err {
        RequestTokenError::ServerResponse(response) => {
            warn!("Token endpoint rejected credentials: {:?}", response);
            RedditApiError::AuthenticationFailed {
                reason: response.error().as_ref().to_string(),
            }
            .into()
        }
        RequestTokenError::Request(e) if e.is_timeout() => RedditApiError::RequestTimeout.into(),
        RequestTokenError::Request(e) => CoreError::Network(e),
        RequestTokenError::Parse(e, body) => {
            // Reddit answers bad credentials with a 401 body that is not a
            // standard OAuth error document.
            warn!(
                "Unexpected token response ({}): {}",
                e,
                String::from_utf8_lossy(&body)
            );
            RedditApiError::AuthenticationFailed {
                reason: "credentials rejected by Reddit".to_string(),
            }
            .into()
        }
        RequestTokenError::Other(message) => {
            RedditApiError::AuthenticationFailed { reason: message }.into()
        }
    }
}
