#[cfg(test)]
mod tests {
    use crate::{
        api, AuthState, CommentTree, MoreStub, RedditClient, RedditOAuth2Config, RedditToken,
    };
    use redscope_core::{
        AppConfig, CoreError, Credentials, RedditApiError, SortMode, TimeFilter,
    };
    use serde_json::{json, Value};
    use std::time::{Duration, SystemTime};

    fn create_test_config() -> RedditOAuth2Config {
        RedditOAuth2Config::new(
            "test_client_id".to_string(),
            "test_client_secret".to_string(),
            "redscope/0.1 (by /u/test_user)".to_string(),
        )
    }

    fn token_expiring_in(offset: Duration, future: bool) -> RedditToken {
        let now = SystemTime::now();
        RedditToken {
            access_token: "token".to_string(),
            expires_at: if future { now + offset } else { now - offset },
            scope: vec!["*".to_string()],
        }
    }

    #[test]
    fn test_config_creation() {
        let config = create_test_config();
        assert_eq!(config.client_id, "test_client_id");
        assert_eq!(config.client_secret, "test_client_secret");
        assert_eq!(config.user_agent, "redscope/0.1 (by /u/test_user)");
        assert_eq!(
            config.token_url(),
            "https://www.reddit.com/api/v1/access_token"
        );
        assert_eq!(config.more_comments_limit, Some(32));
        assert_eq!(config.time_filter, TimeFilter::Month);
    }

    #[test]
    fn test_config_from_settings() {
        let credentials = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_agent: "redscope/0.1".to_string(),
            username: Some("alice".to_string()),
        };
        let mut settings = AppConfig::default();
        settings.reddit.auth_base_url = "http://127.0.0.1:1/".to_string();
        settings.reddit.request_timeout_secs = 5;
        settings.reddit.more_comments_limit = None;
        settings.scrape.default_time_filter = TimeFilter::Week;

        let config = RedditOAuth2Config::from_settings(&credentials, &settings);
        assert_eq!(config.user_agent, "redscope/0.1 (by /u/alice)");
        assert_eq!(config.token_url(), "http://127.0.0.1:1/api/v1/access_token");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.more_comments_limit, None);
        assert_eq!(config.time_filter, TimeFilter::Week);
    }

    #[test]
    fn test_invalid_auth_base_url_is_a_config_error() {
        let config = create_test_config().with_base_urls("not a url", "http://127.0.0.1:1");
        let result = RedditClient::new(config);
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_client_creation() {
        let config = create_test_config();
        let client = RedditClient::new(config);
        assert!(client.is_ok());

        let client = client.unwrap();
        assert!(!client.is_authenticated());
        assert!(!client.needs_refresh());
        assert!(matches!(
            client.get_auth_state(),
            AuthState::NotAuthenticated
        ));
    }

    #[test]
    fn test_token_creation_and_expiry() {
        let valid_token = token_expiring_in(Duration::from_secs(3600), true);
        let expired_token = token_expiring_in(Duration::from_secs(3600), false);
        // Inside the refresh margin counts as expired.
        let nearly_expired = token_expiring_in(Duration::from_secs(10), true);

        assert!(!valid_token.is_expired());
        assert!(expired_token.is_expired());
        assert!(nearly_expired.is_expired());

        let mut client = RedditClient::new(create_test_config()).unwrap();

        client.set_token(valid_token);
        assert!(client.is_authenticated());
        assert!(!client.needs_refresh());

        client.set_token(expired_token);
        assert!(!client.is_authenticated());
        assert!(client.needs_refresh());
        assert!(matches!(
            client.get_auth_state(),
            AuthState::TokenExpired { .. }
        ));
    }

    #[test]
    fn test_token_serialization() {
        let token = RedditToken {
            access_token: "test_access_token".to_string(),
            expires_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1640995200),
            scope: vec!["*".to_string()],
        };

        let serialized = serde_json::to_string(&token).unwrap();
        assert!(serialized.contains("test_access_token"));

        let deserialized: RedditToken = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.access_token, token.access_token);
        assert_eq!(deserialized.expires_at, token.expires_at);
        assert_eq!(deserialized.scope, token.scope);
    }

    #[test]
    fn test_invalid_inputs_fail_before_any_request() {
        // Unroutable endpoints: reaching the network would fail differently.
        let config =
            create_test_config().with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9");
        let mut client = RedditClient::new(config).unwrap();

        let result =
            tokio_test::block_on(client.fetch_post_comments("https://example.com/not/reddit"));
        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::InvalidPostUrl { .. }))
        ));

        let result = tokio_test::block_on(client.fetch_subreddit_posts(
            "not a subreddit!",
            SortMode::Hot,
            10,
        ));
        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::SubredditNotFound { .. }))
        ));

        let posts =
            tokio_test::block_on(client.fetch_subreddit_posts("rust", SortMode::New, 0)).unwrap();
        assert!(posts.is_empty());
        assert!(matches!(
            client.get_auth_state(),
            AuthState::NotAuthenticated
        ));
    }

    fn comment(id: &str, parent: &str, replies: Value) -> Value {
        json!({
            "kind": "t1",
            "data": {
                "id": id,
                "parent_id": parent,
                "body": format!("body of {}", id),
                "author": "someone",
                "score": 1,
                "created_utc": 1_700_000_000.0,
                "replies": replies
            }
        })
    }

    fn listing(children: Vec<Value>) -> Value {
        json!({ "kind": "Listing", "data": { "children": children, "after": null } })
    }

    fn more(id: &str, parent: &str, children: &[&str]) -> Value {
        json!({
            "kind": "more",
            "data": {
                "id": id,
                "parent_id": parent,
                "count": children.len(),
                "children": children
            }
        })
    }

    fn children_of(values: Vec<Value>) -> Vec<api::RedditListingChild<Value>> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn test_comment_tree_flattens_breadth_first() {
        let tree_json = vec![
            comment(
                "a",
                "t3_p",
                listing(vec![
                    comment("a1", "t1_a", listing(vec![comment("a1x", "t1_a1", json!(""))])),
                    more("m1", "t1_a", &["a2", "a3"]),
                ]),
            ),
            comment("b", "t3_p", json!("")),
            more("thread", "t1_b", &[]),
        ];

        let mut tree = CommentTree::new();
        tree.ingest(children_of(tree_json)).unwrap();

        assert_eq!(tree.comment_count(), 4);
        assert_eq!(tree.pending_stubs(), 1);
        assert_eq!(tree.skipped_threads(), 1);

        let stub = tree.next_stub().unwrap();
        assert_eq!(
            stub,
            MoreStub {
                id: "m1".to_string(),
                parent_id: "t1_a".to_string(),
                count: 2,
                children: vec!["a2".to_string(), "a3".to_string()],
            }
        );
        assert!(tree.next_stub().is_none());

        let ids: Vec<String> = tree.into_comments().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b", "a1", "a1x"]);
    }

    #[test]
    fn test_comment_tree_accepts_expanded_children() {
        let mut tree = CommentTree::new();
        tree.ingest(children_of(vec![comment("a", "t3_p", json!(""))]))
            .unwrap();
        tree.ingest(children_of(vec![
            comment("a2", "t1_a", json!("")),
            comment("a3", "t1_a", json!("")),
        ]))
        .unwrap();

        let comments = tree.into_comments();
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[2].parent_id, "t1_a");
        assert_eq!(comments[2].body, "body of a3");
    }

    #[test]
    fn test_comment_tree_drops_repeated_stubs() {
        let mut tree = CommentTree::new();
        tree.ingest(children_of(vec![more("m1", "t3_p", &["a", "b"])]))
            .unwrap();
        let stub = tree.next_stub().unwrap();
        assert_eq!(stub.children, vec!["a".to_string(), "b".to_string()]);

        // the expansion echoes the same stub plus one new id
        tree.ingest(children_of(vec![
            comment("a", "t3_p", json!("")),
            more("m1", "t3_p", &["a", "b"]),
            more("m2", "t3_p", &["b", "c"]),
        ]))
        .unwrap();

        assert_eq!(tree.repeated_stubs(), 1);
        let stub = tree.next_stub().unwrap();
        assert_eq!(stub.id, "m2");
        assert_eq!(stub.children, vec!["c".to_string()]);
        assert!(tree.next_stub().is_none());
    }

    #[test]
    fn test_comment_tree_rejects_malformed_comment() {
        let mut tree = CommentTree::new();
        let bad = children_of(vec![json!({ "kind": "t1", "data": { "id": "x" } })]);
        let result = tree.ingest(bad);
        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::InvalidResponse { .. }))
        ));
    }
}
