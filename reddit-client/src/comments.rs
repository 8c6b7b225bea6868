use crate::api::{RedditCommentData, RedditListingChild, RedditMoreData};
use redscope_core::{Comment, CoreError, RedditApiError};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// An unresolved "more comments" placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoreStub {
    pub id: String,
    pub parent_id: String,
    pub count: u64,
    pub children: Vec<String>,
}

/// Flattens comment listings into records while queueing "more" stubs for
/// later expansion. A child id is queued at most once, so a stub that comes
/// back after expansion is dropped.
#[derive(Debug, Default)]
pub struct CommentTree {
    comments: Vec<Comment>,
    stubs: VecDeque<MoreStub>,
    queued_children: HashSet<String>,
    skipped_threads: usize,
    repeated_stubs: usize,
}

impl CommentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `children` breadth-first, descending into inline replies.
    pub fn ingest(&mut self, children: Vec<RedditListingChild<Value>>) -> Result<(), CoreError> {
        let mut queue: VecDeque<RedditListingChild<Value>> = children.into();

        while let Some(child) = queue.pop_front() {
            match child.kind.as_str() {
                "t1" => {
                    let mut data: RedditCommentData = decode(child.data, "comment")?;
                    if let Some(replies) = data.replies.take() {
                        queue.extend(replies.data.children);
                    }
                    self.comments.push(data.into());
                }
                "more" => {
                    let data: RedditMoreData = decode(child.data, "more-comments stub")?;
                    if data.children.is_empty() {
                        // "continue this thread" link; it has no ids to expand
                        debug!("Skipping continue-thread stub under {}", data.parent_id);
                        self.skipped_threads += 1;
                        continue;
                    }
                    let children: Vec<String> = data
                        .children
                        .into_iter()
                        .filter(|id| self.queued_children.insert(id.clone()))
                        .collect();
                    if children.is_empty() {
                        debug!("Dropping repeated stub {} under {}", data.id, data.parent_id);
                        self.repeated_stubs += 1;
                        continue;
                    }
                    self.stubs.push_back(MoreStub {
                        id: data.id,
                        parent_id: data.parent_id,
                        count: data.count,
                        children,
                    });
                }
                other => warn!("Ignoring unexpected thing kind '{}' in comment tree", other),
            }
        }

        Ok(())
    }

    pub fn next_stub(&mut self) -> Option<MoreStub> {
        self.stubs.pop_front()
    }

    pub fn pending_stubs(&self) -> usize {
        self.stubs.len()
    }

    pub fn skipped_threads(&self) -> usize {
        self.skipped_threads
    }

    pub fn repeated_stubs(&self) -> usize {
        self.repeated_stubs
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn into_comments(self) -> Vec<Comment> {
        self.comments
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: Value, what: &str) -> Result<T, CoreError> {
    serde_json::from_value(data).map_err(|e| {
        RedditApiError::InvalidResponse {
            details: format!("Failed to parse {}: {}", what, e),
        }
        .into()
    })
}
