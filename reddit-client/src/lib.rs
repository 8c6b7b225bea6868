pub mod api;
pub mod auth;
pub mod comments;
pub mod permalink;

#[cfg(test)]
mod tests;

pub use api::{RedditApiClient, MAX_PAGE_SIZE, MORE_CHILDREN_BATCH};
pub use auth::{AuthState, RedditOAuth2Config, RedditToken};
pub use comments::{CommentTree, MoreStub};
pub use permalink::{normalize_subreddit, parse_post_id};

use auth::TokenExchanger;
use redscope_core::{Comment, CoreError, Post, RedditApiError, SortMode};
use tracing::{debug, info, warn};

/// An application-only Reddit session.
///
/// The client obtains a bearer token lazily on first use and exchanges a new
/// one whenever the current token is about to expire. It issues one request
/// at a time.
pub struct RedditClient {
    config: RedditOAuth2Config,
    api: RedditApiClient,
    exchanger: TokenExchanger,
    auth_state: AuthState,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let exchanger = TokenExchanger::new(&config)?;
        let api = RedditApiClient::with_base_url(
            config.user_agent.clone(),
            &config.api_base_url,
            config.request_timeout,
        )?;

        Ok(Self {
            config,
            api,
            exchanger,
            auth_state: AuthState::NotAuthenticated,
        })
    }

    /// Builds a client and exchanges credentials for a token right away.
    pub async fn connect(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let mut client = Self::new(config)?;
        client.authenticate().await?;
        Ok(client)
    }

    pub async fn authenticate(&mut self) -> Result<(), CoreError> {
        let token = self.exchanger.request_token().await?;
        self.auth_state = AuthState::Authenticated { token };
        Ok(())
    }

    pub fn config(&self) -> &RedditOAuth2Config {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth_state, AuthState::Authenticated { ref token } if !token.is_expired())
    }

    pub fn needs_refresh(&self) -> bool {
        match &self.auth_state {
            AuthState::Authenticated { token } => token.is_expired(),
            AuthState::TokenExpired { .. } => true,
            AuthState::NotAuthenticated => false,
        }
    }

    pub fn get_auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    pub fn set_token(&mut self, token: RedditToken) {
        self.auth_state = if token.is_expired() {
            AuthState::TokenExpired { token }
        } else {
            AuthState::Authenticated { token }
        };
    }

    async fn ensure_authenticated(&mut self) -> Result<String, CoreError> {
        match &self.auth_state {
            AuthState::Authenticated { token } if !token.is_expired() => {
                return Ok(token.access_token.clone());
            }
            AuthState::Authenticated { .. } | AuthState::TokenExpired { .. } => {
                debug!("Access token expired, requesting a new one");
            }
            AuthState::NotAuthenticated => {}
        }

        self.authenticate().await?;
        match &self.auth_state {
            AuthState::Authenticated { token } => Ok(token.access_token.clone()),
            _ => Err(RedditApiError::InvalidToken.into()),
        }
    }

    /// Fetches up to `limit` posts from a subreddit in `sort` order,
    /// following listing cursors until the limit or the end of the listing.
    pub async fn fetch_subreddit_posts(
        &mut self,
        subreddit: &str,
        sort: SortMode,
        limit: usize,
    ) -> Result<Vec<Post>, CoreError> {
        let name = normalize_subreddit(subreddit)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let token = self.ensure_authenticated().await?;
        let mut posts: Vec<Post> = Vec::with_capacity(limit.min(MAX_PAGE_SIZE));
        let mut after: Option<String> = None;

        loop {
            let remaining = limit - posts.len();
            let listing = self
                .api
                .get_subreddit_posts(
                    &token,
                    &name,
                    sort,
                    self.config.time_filter,
                    remaining,
                    after.as_deref(),
                )
                .await?;

            let page_len = listing.data.children.len();
            posts.extend(
                listing
                    .data
                    .children
                    .into_iter()
                    .filter(|child| child.kind == "t3")
                    .map(|child| Post::from(child.data)),
            );

            after = listing.data.after;
            if posts.len() >= limit || page_len == 0 || after.is_none() {
                break;
            }
            debug!("Fetched {} of {} posts from r/{}", posts.len(), limit, name);
        }

        posts.truncate(limit);
        info!("Collected {} posts from r/{} ({})", posts.len(), name, sort);
        Ok(posts)
    }

    /// Fetches a post and its flattened comments, expanding "more comments"
    /// stubs up to the configured bound.
    pub async fn fetch_post_comments(&mut self, url: &str) -> Result<(Post, Vec<Comment>), CoreError> {
        let post_id = parse_post_id(url)?;
        let token = self.ensure_authenticated().await?;

        let (post_data, children) = self.api.get_post_with_comments(&token, &post_id).await?;
        let mut tree = CommentTree::new();
        tree.ingest(children)?;

        let link_fullname = format!("t3_{}", post_id);
        let mut expanded = 0usize;
        while let Some(stub) = tree.next_stub() {
            if let Some(max) = self.config.more_comments_limit {
                if expanded >= max {
                    warn!(
                        "Stopped expanding comments for {} after {} stubs; {} left unexpanded",
                        post_id,
                        expanded,
                        tree.pending_stubs() + 1
                    );
                    break;
                }
            }

            debug!(
                "Expanding stub {} ({} hidden comments under {}, {} collected)",
                stub.id,
                stub.count,
                stub.parent_id,
                tree.comment_count()
            );
            for batch in stub.children.chunks(MORE_CHILDREN_BATCH) {
                let things = self
                    .api
                    .get_more_children(&token, &link_fullname, batch)
                    .await?;
                tree.ingest(things)?;
            }
            expanded += 1;
        }

        if tree.skipped_threads() > 0 || tree.repeated_stubs() > 0 {
            debug!(
                "Skipped {} continue-thread links and {} repeated stubs for {}",
                tree.skipped_threads(),
                tree.repeated_stubs(),
                post_id
            );
        }

        let post = Post::from(post_data);
        let comments = tree.into_comments();
        info!("Collected {} comments for post {}", comments.len(), post.id);
        Ok((post, comments))
    }
}
