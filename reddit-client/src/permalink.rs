//! Post-URL and subreddit-name validation.
//!
//! Everything here runs before any network traffic, so malformed input never
//! costs an upstream request.

use redscope_core::RedditApiError;
use url::Url;

const HOST_PREFIXES: &[&str] = &["www.", "old.", "new.", "np.", "m."];
const MAX_POST_ID_LEN: usize = 12;

/// Extracts the base36 post id from a Reddit post URL.
///
/// Accepts `reddit.com/r/<sub>/comments/<id>[/<slug>...]`,
/// `reddit.com/comments/<id>` and `redd.it/<id>`, on the usual
/// `www.`/`old.`/`new.`/`np.`/`m.` hosts, with or without a scheme.
pub fn parse_post_id(input: &str) -> Result<String, RedditApiError> {
    let invalid = |reason: &str| RedditApiError::InvalidPostUrl {
        url: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("URL is empty"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("unsupported scheme"));
    }

    let host = url
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| invalid("URL has no host"))?;
    let host = HOST_PREFIXES
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .unwrap_or(host.as_str())
        .to_string();

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let candidate = match host.as_str() {
        "redd.it" => segments.first().copied(),
        "reddit.com" => segments
            .iter()
            .position(|seg| *seg == "comments")
            .and_then(|idx| segments.get(idx + 1).copied()),
        _ => return Err(invalid("not a reddit.com or redd.it URL")),
    };

    let id = candidate.ok_or_else(|| invalid("no post id segment"))?;
    if !is_post_id(id) {
        return Err(invalid("post id segment is not a valid id"));
    }
    Ok(id.to_ascii_lowercase())
}

fn is_post_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= MAX_POST_ID_LEN
        && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Normalizes a subreddit name, dropping an `r/` or `/r/` prefix.
pub fn normalize_subreddit(input: &str) -> Result<String, RedditApiError> {
    let trimmed = input.trim().trim_matches('/');
    let name = trimmed
        .strip_prefix("r/")
        .or_else(|| trimmed.strip_prefix("R/"))
        .unwrap_or(trimmed);

    let valid = (2..=21).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(RedditApiError::SubredditNotFound {
            subreddit: input.trim().to_string(),
        })
    }
}

/// Absolute link for an upstream `permalink` path.
pub fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("https://www.reddit.com{}", permalink)
    }
}
