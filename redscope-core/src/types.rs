use crate::error::ParseNameError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A flat view over one scraped item, addressable by typed field names.
///
/// Analysis operations and the CSV exporter only see records through this
/// trait, so they work the same for posts and comments.
pub trait Record {
    type TextField: Copy + fmt::Debug;
    type NumericField: Copy + fmt::Debug;

    /// Column names in export order.
    fn columns() -> Vec<&'static str>;

    fn text(&self, field: Self::TextField) -> &str;
    fn numeric(&self, field: Self::NumericField) -> f64;
    fn author(&self) -> &str;
    fn score(&self) -> i64;

    /// Cell values, one per entry of `columns()`.
    fn values(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub author: String,
    pub num_comments: u64,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub selftext: String,
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub parent_id: String,
    pub body: String,
    pub author: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

/// Converts an upstream `created_utc` value, falling back to the epoch for
/// values chrono cannot represent.
pub fn timestamp_from_utc(created_utc: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(created_utc as i64, 0).unwrap_or_default()
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Record for Post {
    type TextField = PostTextField;
    type NumericField = PostNumericField;

    fn columns() -> Vec<&'static str> {
        vec![
            "id",
            "title",
            "score",
            "author",
            "num_comments",
            "created_at",
            "url",
            "selftext",
            "permalink",
        ]
    }

    fn text(&self, field: PostTextField) -> &str {
        match field {
            PostTextField::Title => &self.title,
            PostTextField::Selftext => &self.selftext,
            PostTextField::Author => &self.author,
            PostTextField::Url => &self.url,
        }
    }

    fn numeric(&self, field: PostNumericField) -> f64 {
        match field {
            PostNumericField::Score => self.score as f64,
            PostNumericField::NumComments => self.num_comments as f64,
            PostNumericField::CreatedAt => self.created_at.timestamp() as f64,
        }
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn score(&self) -> i64 {
        self.score
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.score.to_string(),
            self.author.clone(),
            self.num_comments.to_string(),
            format_timestamp(&self.created_at),
            self.url.clone(),
            self.selftext.clone(),
            self.permalink.clone(),
        ]
    }
}

impl Record for Comment {
    type TextField = CommentTextField;
    type NumericField = CommentNumericField;

    fn columns() -> Vec<&'static str> {
        vec!["id", "parent_id", "body", "author", "score", "created_at"]
    }

    fn text(&self, field: CommentTextField) -> &str {
        match field {
            CommentTextField::Body => &self.body,
            CommentTextField::Author => &self.author,
        }
    }

    fn numeric(&self, field: CommentNumericField) -> f64 {
        match field {
            CommentNumericField::Score => self.score as f64,
            CommentNumericField::CreatedAt => self.created_at.timestamp() as f64,
        }
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn score(&self) -> i64 {
        self.score
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.parent_id.clone(),
            self.body.clone(),
            self.author.clone(),
            self.score.to_string(),
            format_timestamp(&self.created_at),
        ]
    }
}

fn parse_name<T: Copy>(
    kind: &'static str,
    value: &str,
    all: &[T],
    name: fn(T) -> &'static str,
) -> Result<T, ParseNameError> {
    let wanted = value.trim().to_ascii_lowercase();
    all.iter()
        .copied()
        .find(|candidate| name(*candidate) == wanted)
        .ok_or_else(|| ParseNameError {
            kind,
            value: value.to_string(),
            expected: all
                .iter()
                .map(|candidate| name(*candidate))
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Declares a lowercase-named enum with `as_str`, `Display` and `FromStr`.
macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseNameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_name($kind, s, Self::ALL, $name::as_str)
            }
        }
    };
}

named_enum!(PostTextField, "post text field", {
    Title => "title",
    Selftext => "selftext",
    Author => "author",
    Url => "url",
});

named_enum!(PostNumericField, "post numeric field", {
    Score => "score",
    NumComments => "num_comments",
    CreatedAt => "created_at",
});

named_enum!(CommentTextField, "comment text field", {
    Body => "body",
    Author => "author",
});

named_enum!(CommentNumericField, "comment numeric field", {
    Score => "score",
    CreatedAt => "created_at",
});

named_enum!(
    /// Upstream listing order; each maps to its own listing endpoint.
    SortMode, "sort mode", {
        Hot => "hot",
        New => "new",
        Top => "top",
        Rising => "rising",
    }
);

named_enum!(
    /// Time window for `top` listings.
    TimeFilter, "time filter", {
        Hour => "hour",
        Day => "day",
        Week => "week",
        Month => "month",
        Year => "year",
        All => "all",
    }
);

impl SortMode {
    pub fn uses_time_filter(self) -> bool {
        matches!(self, SortMode::Top)
    }
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Hot
    }
}

impl Default for TimeFilter {
    fn default() -> Self {
        TimeFilter::Month
    }
}

macro_rules! serde_by_name {
    ($($name:ident),+) => {
        $(
            impl Serialize for $name {
                fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.as_str())
                }
            }

            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let raw = String::deserialize(deserializer)?;
                    raw.parse().map_err(serde::de::Error::custom)
                }
            }
        )+
    };
}

serde_by_name!(SortMode, TimeFilter);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        Post {
            id: "abc123".to_string(),
            title: "Hello, world".to_string(),
            score: 42,
            author: "someone".to_string(),
            num_comments: 7,
            created_at: timestamp_from_utc(1_640_995_200.0),
            url: "https://example.com".to_string(),
            selftext: String::new(),
            permalink: "https://www.reddit.com/r/rust/comments/abc123/hello/".to_string(),
        }
    }

    #[test]
    fn test_post_values_follow_columns() {
        let post = sample_post();
        let values = post.values();
        assert_eq!(values.len(), Post::columns().len());
        assert_eq!(values[0], "abc123");
        assert_eq!(values[2], "42");
        assert_eq!(values[5], "2022-01-01T00:00:00Z");
    }

    #[test]
    fn test_numeric_fields() {
        let post = sample_post();
        assert_eq!(post.numeric(PostNumericField::Score), 42.0);
        assert_eq!(post.numeric(PostNumericField::NumComments), 7.0);
        assert_eq!(
            post.numeric(PostNumericField::CreatedAt),
            1_640_995_200.0
        );
    }

    #[test]
    fn test_sort_mode_parsing() {
        assert_eq!("hot".parse::<SortMode>().unwrap(), SortMode::Hot);
        assert_eq!(" Rising ".parse::<SortMode>().unwrap(), SortMode::Rising);

        let err = "best".parse::<SortMode>().unwrap_err();
        assert_eq!(err.kind, "sort mode");
        assert_eq!(err.expected, "hot, new, top, rising");
    }

    #[test]
    fn test_only_top_uses_time_filter() {
        assert!(SortMode::Top.uses_time_filter());
        assert!(!SortMode::Hot.uses_time_filter());
        assert!(!SortMode::Rising.uses_time_filter());
    }

    #[test]
    fn test_field_names_round_trip_through_display() {
        for field in CommentTextField::ALL {
            assert_eq!(field.to_string().parse::<CommentTextField>().unwrap(), *field);
        }
        assert!("title".parse::<CommentTextField>().is_err());
    }

    #[test]
    fn test_sort_mode_deserializes_from_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            sort: SortMode,
        }

        let wrapper: Wrapper = serde_json::from_str(r#"{"sort":"top"}"#).unwrap();
        assert_eq!(wrapper.sort, SortMode::Top);
        assert!(serde_json::from_str::<Wrapper>(r#"{"sort":"best"}"#).is_err());
    }
}
