//! Plain-text rendering of scrape results for the terminal.

use redscope_core::{
    AnalysisSettings, Comment, CommentNumericField, CommentTextField, Post, PostNumericField,
    PostTextField, Record, SortMode,
};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Write};
use text_analysis::{
    distribution_buckets, distribution_by_key, filter_by_label, rank_by, sentiment_counts,
    summarize, top_authors, top_words, word_frequencies, Annotated, Histogram, SentimentLabel,
    Summary,
};

const BAR_WIDTH: usize = 40;
const TITLE_WIDTH: usize = 60;
const WORDS_SHOWN: usize = 20;
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub top_n: usize,
    pub bucket_count: usize,
    pub max_words: usize,
    pub stopwords: HashSet<String>,
    /// Rank the listing table lowest first.
    pub ascending: bool,
    /// Only list records with this label in the ranking table.
    pub sentiment: Option<SentimentLabel>,
}

impl ReportOptions {
    pub fn from_settings(settings: &AnalysisSettings, stopwords: HashSet<String>) -> Self {
        Self {
            top_n: settings.top_n,
            bucket_count: settings.bucket_count,
            max_words: settings.max_words,
            stopwords,
            ascending: false,
            sentiment: None,
        }
    }

    pub fn with_top_n(mut self, top_n: Option<usize>) -> Self {
        if let Some(top_n) = top_n {
            self.top_n = top_n;
        }
        self
    }

    pub fn with_bucket_count(mut self, bucket_count: Option<usize>) -> Self {
        if let Some(bucket_count) = bucket_count {
            self.bucket_count = bucket_count;
        }
        self
    }

    pub fn with_ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    pub fn with_sentiment(mut self, sentiment: Option<SentimentLabel>) -> Self {
        self.sentiment = sentiment;
        self
    }

    fn ranked<R>(&self, records: &[Annotated<R>], field: R::NumericField) -> Vec<Annotated<R>>
    where
        R: Record + Clone,
    {
        match self.sentiment {
            Some(label) => {
                let matching = filter_by_label(records, label);
                rank_by(&matching, field, self.top_n, self.ascending)
            }
            None => rank_by(records, field, self.top_n, self.ascending),
        }
    }

    fn ranking_title(&self, noun: &str, field: impl Display) -> String {
        let label = self
            .sentiment
            .map(|label| format!("{} ", label))
            .unwrap_or_default();
        let direction = if self.ascending { ", ascending" } else { "" };
        format!("Top {} {}{} by {}{}", self.top_n, label, noun, field, direction)
    }
}

pub fn subreddit_report(
    subreddit: &str,
    sort: SortMode,
    text_field: PostTextField,
    sort_by: PostNumericField,
    posts: &[Annotated<Post>],
    options: &ReportOptions,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "r/{} ({}), {} posts", subreddit, sort, posts.len());
    if posts.is_empty() {
        let _ = writeln!(out, "\nNo posts returned.");
        return out;
    }

    render_summary(&mut out, "Posts", &summarize(posts));

    section(&mut out, &options.ranking_title("posts", sort_by));
    let rows: Vec<Vec<String>> = options
        .ranked(posts, sort_by)
        .iter()
        .enumerate()
        .map(|(rank, post)| {
            vec![
                (rank + 1).to_string(),
                post.record.score.to_string(),
                post.record.num_comments.to_string(),
                post.record.created_at.format(CREATED_FORMAT).to_string(),
                post.record.author.clone(),
                truncate(&post.record.title, TITLE_WIDTH),
            ]
        })
        .collect();
    out.push_str(&render_table(
        &["#", "score", "comments", "created", "author", "title"],
        &rows,
    ));

    section(&mut out, "Score distribution");
    out.push_str(&render_histogram(&distribution_buckets(
        posts,
        PostNumericField::Score,
        options.bucket_count,
    )));

    render_sentiment(&mut out, &format!("Sentiment of {}", text_field), posts, options);
    render_words(
        &mut out,
        &word_frequencies(posts, text_field, &options.stopwords),
        options,
    );
    out
}

pub fn post_report(
    post: &Post,
    comments: &[Annotated<Comment>],
    sort_by: CommentNumericField,
    options: &ReportOptions,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", post.title);
    let _ = writeln!(
        out,
        "by u/{} | score {} | {} comments | {}",
        post.author,
        post.score,
        post.num_comments,
        post.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "{}", post.permalink);
    if !post.selftext.is_empty() {
        let _ = writeln!(out, "\n{}", truncate(&post.selftext, 400));
    }

    if comments.is_empty() {
        let _ = writeln!(out, "\nNo comments scraped.");
        return out;
    }

    render_summary(&mut out, "Comments", &summarize(comments));

    section(&mut out, &options.ranking_title("comments", sort_by));
    let rows: Vec<Vec<String>> = options
        .ranked(comments, sort_by)
        .iter()
        .enumerate()
        .map(|(rank, comment)| {
            vec![
                (rank + 1).to_string(),
                comment.record.score.to_string(),
                comment.record.created_at.format(CREATED_FORMAT).to_string(),
                comment.record.author.clone(),
                truncate(&comment.record.body, TITLE_WIDTH),
            ]
        })
        .collect();
    out.push_str(&render_table(&["#", "score", "created", "author", "comment"], &rows));

    section(&mut out, "Score distribution");
    out.push_str(&render_histogram(&distribution_buckets(
        comments,
        CommentNumericField::Score,
        options.bucket_count,
    )));

    section(&mut out, "Top commenters");
    let rows: Vec<Vec<String>> = top_authors(comments, options.top_n)
        .into_iter()
        .map(|(author, count)| vec![author, count.to_string()])
        .collect();
    out.push_str(&render_table(&["author", "comments"], &rows));

    render_sentiment(&mut out, "Comment sentiment", comments, options);
    render_words(
        &mut out,
        &word_frequencies(comments, CommentTextField::Body, &options.stopwords),
        options,
    );
    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}\n{}", title, "-".repeat(title.chars().count()));
}

fn render_summary(out: &mut String, noun: &str, summary: &Summary) {
    section(out, "Summary");
    let _ = writeln!(out, "{:<16}{}", noun, summary.count);
    if let Some(mean) = summary.mean_score {
        let _ = writeln!(out, "{:<16}{:.1}", "Average score", mean);
    }
    if let (Some(min), Some(max)) = (summary.min_score, summary.max_score) {
        let _ = writeln!(out, "{:<16}{} to {}", "Score range", min, max);
    }
    let _ = writeln!(out, "{:<16}{}", "Unique authors", summary.unique_authors);
}

fn render_sentiment<R: Record>(
    out: &mut String,
    title: &str,
    annotated: &[Annotated<R>],
    options: &ReportOptions,
) {
    section(out, title);
    let counts = sentiment_counts(annotated);
    for label in SentimentLabel::ALL {
        let _ = writeln!(out, "{:<10}{}", label, counts.get(label));
    }
    let _ = writeln!(out);
    out.push_str(&render_histogram(&distribution_by_key(
        annotated,
        |item| item.sentiment_polarity,
        options.bucket_count,
    )));
}

fn render_words(
    out: &mut String,
    frequencies: &HashMap<String, usize>,
    options: &ReportOptions,
) {
    let words = top_words(frequencies, options.max_words);
    section(
        out,
        &format!("Top words ({} distinct)", frequencies.len()),
    );
    if words.is_empty() {
        let _ = writeln!(out, "(none)");
        return;
    }
    let line = words
        .iter()
        .take(WORDS_SHOWN)
        .map(|(word, count)| format!("{} ({})", word, count))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "{}", line);
}

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        let mut line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ");
        line.truncate(line.trim_end().len());
        line.push('\n');
        line
    };

    let mut out = format_row(headers.to_vec());
    for row in rows {
        out.push_str(&format_row(row.iter().map(String::as_str).collect()));
    }
    out
}

pub fn render_histogram(histogram: &Histogram) -> String {
    if histogram.is_empty() {
        return "(no data)\n".to_string();
    }

    let max_count = histogram.max_count().max(1);
    let mut out = String::new();
    for bucket in &histogram.buckets {
        let bar_len = (bucket.count * BAR_WIDTH).div_ceil(max_count);
        let _ = writeln!(
            out,
            "[{:>9.2}, {:>9.2}] {:<width$} {}",
            bucket.lower,
            bucket.upper,
            "#".repeat(bar_len),
            bucket.count,
            width = BAR_WIDTH
        );
    }
    out
}

/// Single-line prefix of `text` at most `max` characters long.
fn truncate(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
