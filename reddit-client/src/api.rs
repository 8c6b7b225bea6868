use crate::permalink::absolute_permalink;
use redscope_core::{
    timestamp_from_utc, Comment, CoreError, Post, RedditApiError, SortMode, TimeFilter,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Largest page the listing endpoints hand out.
pub const MAX_PAGE_SIZE: usize = 100;

/// Largest id batch `morechildren` accepts in one call.
pub const MORE_CHILDREN_BATCH: usize = 100;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

fn deleted_author() -> String {
    "[deleted]".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default = "deleted_author")]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub parent_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "deleted_author")]
    pub author: String,
    #[serde(default)]
    pub score: i64,
    pub created_utc: f64,
    #[serde(default)]
    pub depth: u32,
    /// Upstream sends an empty string instead of a listing for leaf comments.
    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Option<RedditListing<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditMoreData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub parent_id: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

#[derive(Debug, Clone, Deserialize)]
struct MoreChildrenJson {
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default)]
    data: Option<MoreChildrenData>,
}

#[derive(Debug, Clone, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<RedditListingChild<Value>>,
}

fn deserialize_replies<'de, D>(deserializer: D) -> Result<Option<RedditListing<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => serde_json::from_value(Value::Object(map))
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// What an endpoint is about, so status codes map to the right error.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Subreddit(&'a str),
    Post(&'a str),
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: String,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_API_BASE, Duration::from_secs(30))
    }

    pub fn with_base_url(
        user_agent: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        // Upstream answers unknown subreddits with a redirect to search; keep
        // it visible instead of following it.
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        target: Target<'_>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .query(&[("raw_json", "1")]);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(RedditApiError::RequestTimeout.into());
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        Err(status_error(status, &response, endpoint, target).into())
    }

    /// Fetches one listing page of `sort` order for a subreddit.
    pub async fn get_subreddit_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        sort: SortMode,
        time_filter: TimeFilter,
        limit: usize,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/{}", subreddit, sort.as_str());
        let limit_str = limit.min(MAX_PAGE_SIZE).to_string();
        let mut params = vec![("limit", limit_str.as_str())];

        if sort.uses_time_filter() {
            params.push(("t", time_filter.as_str()));
        }
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self
            .make_request(
                Method::GET,
                &endpoint,
                access_token,
                Some(params.as_slice()),
                Target::Subreddit(subreddit),
            )
            .await?;

        let listing: RedditListing<RedditPostData> =
            parse_json(response, &format!("posts for r/{}", subreddit)).await?;

        info!(
            "Retrieved {} posts from r/{} ({})",
            listing.data.children.len(),
            subreddit,
            sort
        );
        Ok(listing)
    }

    /// Fetches a post and the first batch of its comment tree.
    pub async fn get_post_with_comments(
        &self,
        access_token: &str,
        post_id: &str,
    ) -> Result<(RedditPostData, Vec<RedditListingChild<Value>>), CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let response = self
            .make_request(
                Method::GET,
                &endpoint,
                access_token,
                None,
                Target::Post(post_id),
            )
            .await?;

        let mut listings: Vec<RedditListing<Value>> =
            parse_json(response, &format!("comments for post {}", post_id)).await?;
        if listings.len() < 2 {
            return Err(RedditApiError::InvalidResponse {
                details: format!(
                    "expected post and comment listings for {}, got {}",
                    post_id,
                    listings.len()
                ),
            }
            .into());
        }

        let comments = listings.remove(1).data.children;
        let post_child = listings
            .remove(0)
            .data
            .children
            .into_iter()
            .find(|child| child.kind == "t3")
            .ok_or_else(|| RedditApiError::PostNotFound {
                post_id: post_id.to_string(),
            })?;
        let post: RedditPostData = serde_json::from_value(post_child.data).map_err(|e| {
            error!("Failed to parse post {}: {}", post_id, e);
            RedditApiError::InvalidResponse {
                details: format!("Failed to parse post {}", post_id),
            }
        })?;

        debug!(
            "Retrieved post {} with {} top-level comment entries",
            post_id,
            comments.len()
        );
        Ok((post, comments))
    }

    /// Resolves child ids of a "more comments" stub into flat comment things.
    pub async fn get_more_children(
        &self,
        access_token: &str,
        link_fullname: &str,
        children: &[String],
    ) -> Result<Vec<RedditListingChild<Value>>, CoreError> {
        let ids = children.join(",");
        let params = [
            ("api_type", "json"),
            ("link_id", link_fullname),
            ("children", ids.as_str()),
        ];

        let response = self
            .make_request(
                Method::GET,
                "/api/morechildren",
                access_token,
                Some(&params[..]),
                Target::Post(link_fullname),
            )
            .await?;

        let body: MoreChildrenResponse =
            parse_json(response, &format!("more comments for {}", link_fullname)).await?;
        if !body.json.errors.is_empty() {
            warn!(
                "morechildren for {} reported errors: {:?}",
                link_fullname, body.json.errors
            );
        }

        let things = body.json.data.map(|d| d.things).unwrap_or_default();
        debug!(
            "Resolved {} of {} requested children for {}",
            things.len(),
            children.len(),
            link_fullname
        );
        Ok(things)
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, CoreError> {
    response.json().await.map_err(|e| {
        error!("Failed to parse {}: {}", what, e);
        if e.is_timeout() {
            return CoreError::RedditApi(RedditApiError::RequestTimeout);
        }
        CoreError::RedditApi(RedditApiError::InvalidResponse {
            details: format!("Failed to parse {}", what),
        })
    })
}

fn status_error(
    status: StatusCode,
    response: &Response,
    endpoint: &str,
    target: Target<'_>,
) -> RedditApiError {
    let not_found = || match target {
        Target::Subreddit(name) => RedditApiError::SubredditNotFound {
            subreddit: name.to_string(),
        },
        Target::Post(id) => RedditApiError::PostNotFound {
            post_id: id.to_string(),
        },
    };

    match status.as_u16() {
        429 => {
            let retry_after = retry_after_secs(response).unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!("Rate limited, retry after {} seconds", retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        401 => RedditApiError::InvalidToken,
        // Private and quarantined communities answer 403, banned ones 404,
        // unknown ones redirect to search.
        403 | 404 | 300..=399 => not_found(),
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        _ => RedditApiError::InvalidResponse {
            details: format!("{} returned {}", endpoint, status),
        },
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    ["retry-after", "x-ratelimit-reset"]
        .iter()
        .filter_map(|name| response.headers().get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.trim().parse::<f64>().ok())
        .map(|secs| secs.ceil().max(0.0) as u64)
        .next()
}

impl From<RedditPostData> for Post {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: post_data.id,
            title: post_data.title,
            score: post_data.score,
            author: post_data.author,
            num_comments: post_data.num_comments,
            created_at: timestamp_from_utc(post_data.created_utc),
            url: post_data.url,
            selftext: post_data.selftext,
            permalink: absolute_permalink(&post_data.permalink),
        }
    }
}

impl From<RedditCommentData> for Comment {
    fn from(comment_data: RedditCommentData) -> Self {
        Self {
            id: comment_data.id,
            parent_id: comment_data.parent_id,
            body: comment_data.body,
            author: comment_data.author,
            score: comment_data.score,
            created_at: timestamp_from_utc(comment_data.created_utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_creation() {
        let client = RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();
        assert_eq!(client.user_agent(), "test-user-agent/1.0");
        assert_eq!(client.base_url, REDDIT_API_BASE);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = RedditApiClient::with_base_url(
            "ua".to_string(),
            "http://127.0.0.1:9999/",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_reddit_post_conversion() {
        let post_data: RedditPostData = serde_json::from_value(serde_json::json!({
            "id": "test123",
            "name": "t3_test123",
            "title": "Test Post",
            "selftext": "This is test content",
            "author": "test_user",
            "subreddit": "test",
            "url": "https://example.com/article",
            "permalink": "/r/test/comments/test123/test_post/",
            "created_utc": 1640995200.0,
            "score": 42,
            "num_comments": 5,
            "is_self": true
        }))
        .unwrap();

        let post: Post = post_data.into();
        assert_eq!(post.id, "test123");
        assert_eq!(post.title, "Test Post");
        assert_eq!(post.selftext, "This is test content");
        assert_eq!(post.score, 42);
        assert_eq!(post.num_comments, 5);
        assert_eq!(post.created_at.timestamp(), 1_640_995_200);
        assert_eq!(
            post.permalink,
            "https://www.reddit.com/r/test/comments/test123/test_post/"
        );
    }

    #[test]
    fn test_missing_author_becomes_deleted() {
        let post_data: RedditPostData = serde_json::from_value(serde_json::json!({
            "id": "x1",
            "title": "t",
            "created_utc": 0.0
        }))
        .unwrap();
        assert_eq!(post_data.author, "[deleted]");
    }

    #[test]
    fn test_replies_accepts_empty_string() {
        let leaf: RedditCommentData = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "parent_id": "t3_p1",
            "body": "leaf",
            "author": "a",
            "score": 1,
            "created_utc": 1.0,
            "replies": ""
        }))
        .unwrap();
        assert!(leaf.replies.is_none());

        let parent: RedditCommentData = serde_json::from_value(serde_json::json!({
            "id": "c2",
            "parent_id": "t3_p1",
            "body": "parent",
            "author": "a",
            "score": 1,
            "created_utc": 1.0,
            "replies": {
                "kind": "Listing",
                "data": { "children": [], "after": null, "before": null }
            }
        }))
        .unwrap();
        assert!(parent.replies.is_some());
    }
}
