//! Pure transforms over scraped records: sentiment annotation, word counts,
//! rankings, histograms, summaries and CSV export.
//!
//! Nothing here touches the network. Every function accepts an empty slice and
//! returns an empty result for it.

pub mod export;
pub mod sentiment;
pub mod stats;
pub mod words;

pub use export::{write_csv, write_csv_file};
pub use sentiment::{
    add_sentiment, filter_by_label, Annotated, LexiconScorer, SentimentLabel, SentimentScorer,
    SentimentThresholds,
};
pub use stats::{
    distribution_buckets, distribution_by_key, rank_by, sentiment_counts, summarize,
    top_authors, top_n_by, top_n_by_key, Bucket, Histogram, SentimentCounts, Summary,
};
pub use words::{default_stopwords, tokenize, top_words, word_frequencies};
