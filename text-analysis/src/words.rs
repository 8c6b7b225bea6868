use redscope_core::Record;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static NON_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").unwrap());

const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "dont", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "im", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "thats", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
    "yourself", "yourselves",
];

/// English stopwords plus any `extra` words, lowercased.
pub fn default_stopwords<I, S>(extra: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    DEFAULT_STOPWORDS
        .iter()
        .map(|word| word.to_string())
        .chain(extra.into_iter().map(|word| word.as_ref().trim().to_lowercase()))
        .filter(|word| !word.is_empty())
        .collect()
}

/// Lowercases `text`, drops anything that is not a letter, digit or
/// whitespace, and splits on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_WORD_REGEX
        .replace_all(&lowered, "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Counts non-stopword tokens of `field` across all records.
pub fn word_frequencies<R: Record>(
    records: &[R],
    field: R::TextField,
    stopwords: &HashSet<String>,
) -> HashMap<String, usize> {
    let mut frequencies = HashMap::new();
    for record in records {
        for word in tokenize(record.text(field)) {
            if !stopwords.contains(&word) {
                *frequencies.entry(word).or_insert(0) += 1;
            }
        }
    }
    frequencies
}

/// The `n` most frequent words, by count descending then word ascending.
pub fn top_words(frequencies: &HashMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut words: Vec<(String, usize)> = frequencies
        .iter()
        .map(|(word, count)| (word.clone(), *count))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(n);
    words
}
