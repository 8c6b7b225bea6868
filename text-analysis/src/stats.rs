//! Ranking, histograms and summary figures over record collections.

use crate::sentiment::{Annotated, SentimentLabel};
use redscope_core::{Record, MAX_BUCKETS};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// The `n` records with the highest `field`, ties in input order.
pub fn top_n_by<R>(records: &[R], field: R::NumericField, n: usize) -> Vec<R>
where
    R: Record + Clone,
{
    top_n_by_key(records, |record| record.numeric(field), n)
}

/// [`top_n_by`] in either direction; `ascending` puts the lowest `field` first.
pub fn rank_by<R>(records: &[R], field: R::NumericField, n: usize, ascending: bool) -> Vec<R>
where
    R: Record + Clone,
{
    if ascending {
        top_n_by_key(records, |record| -record.numeric(field), n)
    } else {
        top_n_by(records, field, n)
    }
}

pub fn top_n_by_key<R, F>(records: &[R], key: F, n: usize) -> Vec<R>
where
    R: Clone,
    F: Fn(&R) -> f64,
{
    let mut ranked: Vec<(f64, &R)> = records.iter().map(|record| (key(record), record)).collect();
    // sort_by is stable, so equal keys keep their input order
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    ranked
        .into_iter()
        .take(n)
        .map(|(_, record)| record.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub buckets: Vec<Bucket>,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.count).max().unwrap_or(0)
    }
}

/// Equal-width histogram of `field` between the observed min and max.
/// `bucket_count` is capped at [`MAX_BUCKETS`].
pub fn distribution_buckets<R: Record>(
    records: &[R],
    field: R::NumericField,
    bucket_count: usize,
) -> Histogram {
    distribution_by_key(records, |record| record.numeric(field), bucket_count)
}

pub fn distribution_by_key<R, F>(records: &[R], key: F, bucket_count: usize) -> Histogram
where
    F: Fn(&R) -> f64,
{
    if records.is_empty() || bucket_count == 0 {
        return Histogram::default();
    }
    let bucket_count = bucket_count.min(MAX_BUCKETS);

    let values: Vec<f64> = records.iter().map(key).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bucket_count as f64;

    let mut buckets: Vec<Bucket> = (0..bucket_count)
        .map(|i| Bucket {
            lower: min + width * i as f64,
            upper: if i + 1 == bucket_count {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for value in values {
        let index = if width > 0.0 {
            (((value - min) / width).floor() as usize).min(bucket_count - 1)
        } else {
            0
        };
        buckets[index].count += 1;
    }

    Histogram { buckets }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean_score: Option<f64>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub unique_authors: usize,
}

pub fn summarize<R: Record>(records: &[R]) -> Summary {
    let scores: Vec<i64> = records.iter().map(Record::score).collect();
    let mean_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<i64>() as f64 / scores.len() as f64)
    };

    Summary {
        count: records.len(),
        mean_score,
        min_score: scores.iter().copied().min(),
        max_score: scores.iter().copied().max(),
        unique_authors: records
            .iter()
            .map(Record::author)
            .collect::<HashSet<_>>()
            .len(),
    }
}

/// Authors by record count descending, ties by first appearance.
pub fn top_authors<R: Record>(records: &[R], n: usize) -> Vec<(String, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let author = record.author();
        let count = counts.entry(author).or_insert_with(|| {
            order.push(author);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|author| (author.to_string(), counts[author]))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    pub fn get(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

pub fn sentiment_counts<R>(annotated: &[Annotated<R>]) -> SentimentCounts {
    annotated
        .iter()
        .fold(SentimentCounts::default(), |mut counts, item| {
            match item.sentiment_label {
                SentimentLabel::Positive => counts.positive += 1,
                SentimentLabel::Neutral => counts.neutral += 1,
                SentimentLabel::Negative => counts.negative += 1,
            }
            counts
        })
}
