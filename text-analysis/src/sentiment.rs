//! Lexicon-based sentiment scoring for scraped records.
//!
//! Polarity is a scalar in [-1, 1]. The built-in scorer averages the polarity
//! of every lexicon word found in the text, scaled by a preceding intensifier
//! and flipped with damping after a negator.

use redscope_core::{AnalysisSettings, ParseNameError, Record};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}']+").unwrap());

/// Applied to a lexicon hit that follows a negator.
const NEGATION_FACTOR: f64 = -0.5;
/// How many tokens a negator reaches forward.
const NEGATION_WINDOW: usize = 3;

pub trait SentimentScorer {
    /// Polarity of `text` in [-1, 1]; 0 when nothing in it carries sentiment.
    fn polarity(&self, text: &str) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl FromStr for SentimentLabel {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SentimentLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == wanted)
            .ok_or_else(|| ParseNameError {
                kind: "sentiment label",
                value: s.to_string(),
                expected: "positive, neutral, negative".to_string(),
            })
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Polarity cut-offs; both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentThresholds {
    pub positive: f64,
    pub negative: f64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            positive: 0.1,
            negative: -0.1,
        }
    }
}

impl SentimentThresholds {
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self {
            positive: settings.positive_threshold,
            negative: settings.negative_threshold,
        }
    }

    pub fn label(&self, polarity: f64) -> SentimentLabel {
        if polarity > self.positive {
            SentimentLabel::Positive
        } else if polarity < self.negative {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// Word-list scorer with intensifiers and negation handling.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
    intensifiers: HashMap<&'static str, f64>,
    negators: HashSet<&'static str>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            lexicon: Self::build_lexicon(),
            intensifiers: Self::build_intensifiers(),
            negators: Self::build_negators(),
        }
    }

    /// Adds or overrides a lexicon entry. Weights are clamped to [-1, 1].
    pub fn with_word(mut self, word: &str, weight: f64) -> Self {
        self.lexicon
            .insert(word.to_lowercase(), weight.clamp(-1.0, 1.0));
        self
    }

    pub fn lexicon_size(&self) -> usize {
        self.lexicon.len()
    }

    fn is_negator(&self, token: &str) -> bool {
        self.negators.contains(token) || token.ends_with("n't")
    }

    fn build_lexicon() -> HashMap<String, f64> {
        [
            // Strong positive
            ("love", 0.8), ("loved", 0.8), ("loving", 0.7), ("amazing", 0.8),
            ("awesome", 0.8), ("excellent", 0.8), ("fantastic", 0.8), ("wonderful", 0.8),
            ("brilliant", 0.7), ("perfect", 0.8), ("incredible", 0.7), ("outstanding", 0.8),
            ("best", 0.7), ("beautiful", 0.7), ("superb", 0.8), ("delightful", 0.7),
            // Mild positive
            ("good", 0.5), ("great", 0.6), ("nice", 0.4), ("like", 0.3), ("liked", 0.3),
            ("happy", 0.6), ("glad", 0.5), ("enjoy", 0.5), ("enjoyed", 0.5), ("fun", 0.5),
            ("cool", 0.4), ("helpful", 0.5), ("useful", 0.4), ("interesting", 0.3),
            ("thanks", 0.4), ("thank", 0.4), ("agree", 0.3), ("win", 0.5), ("won", 0.5),
            ("better", 0.4), ("improved", 0.4), ("easy", 0.3), ("fast", 0.3), ("clean", 0.3),
            ("fair", 0.2), ("recommend", 0.5), ("impressive", 0.6), ("solid", 0.4),
            ("exciting", 0.6), ("excited", 0.6), ("funny", 0.4), ("lol", 0.3),
            ("success", 0.6), ("successful", 0.6), ("correct", 0.3), ("right", 0.2),
            ("safe", 0.3), ("support", 0.3), ("welcome", 0.4), ("works", 0.3),
            // Mild negative
            ("bad", -0.5), ("wrong", -0.4), ("sad", -0.5), ("annoying", -0.5),
            ("boring", -0.4), ("slow", -0.3), ("broken", -0.5), ("bug", -0.3),
            ("bugs", -0.3), ("problem", -0.3), ("problems", -0.3), ("issue", -0.2),
            ("issues", -0.2), ("difficult", -0.3), ("hard", -0.2), ("confusing", -0.4),
            ("disappointed", -0.6), ("disappointing", -0.6), ("fail", -0.5),
            ("failed", -0.5), ("failure", -0.6), ("lose", -0.4), ("lost", -0.4),
            ("worse", -0.5), ("ugly", -0.5), ("stupid", -0.6), ("dumb", -0.5),
            ("angry", -0.6), ("upset", -0.5), ("sorry", -0.2), ("unfortunately", -0.3),
            ("scam", -0.7), ("fake", -0.5), ("useless", -0.6), ("waste", -0.5),
            ("crash", -0.5), ("crashes", -0.5), ("risk", -0.2), ("fear", -0.4),
            // Strong negative
            ("hate", -0.8), ("hated", -0.8), ("terrible", -0.8), ("awful", -0.8),
            ("horrible", -0.8), ("worst", -0.8), ("disgusting", -0.8), ("pathetic", -0.7),
            ("garbage", -0.7), ("trash", -0.6), ("nightmare", -0.7), ("toxic", -0.7),
        ]
        .into_iter()
        .map(|(word, weight)| (word.to_string(), weight))
        .collect()
    }

    fn build_intensifiers() -> HashMap<&'static str, f64> {
        [
            ("very", 1.5),
            ("really", 1.5),
            ("extremely", 1.8),
            ("so", 1.3),
            ("super", 1.5),
            ("incredibly", 1.8),
            ("totally", 1.4),
            ("absolutely", 1.6),
            ("quite", 1.2),
            ("pretty", 1.1),
            ("slightly", 0.6),
            ("somewhat", 0.7),
            ("barely", 0.5),
        ]
        .into_iter()
        .collect()
    }

    fn build_negators() -> HashSet<&'static str> {
        [
            "not", "no", "never", "none", "nobody", "nothing", "neither", "nor",
            "cannot", "without", "hardly",
        ]
        .into_iter()
        .collect()
    }
}

impl SentimentScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        // typographic apostrophes (don’t) tokenize like ASCII ones
        let lowered = text.to_lowercase().replace('\u{2019}', "'");

        let mut total = 0.0;
        let mut hits = 0usize;
        let mut multiplier = 1.0;
        let mut negation_left = 0usize;

        for token in TOKEN_REGEX.find_iter(&lowered).map(|m| m.as_str()) {
            let token = token.trim_matches('\'');
            if token.is_empty() {
                continue;
            }

            if self.is_negator(token) {
                negation_left = NEGATION_WINDOW;
                continue;
            }

            if let Some(factor) = self.intensifiers.get(token) {
                multiplier *= factor;
                continue;
            }

            if let Some(weight) = self.lexicon.get(token) {
                let mut score = weight * multiplier;
                if negation_left > 0 {
                    score *= NEGATION_FACTOR;
                }
                total += score;
                hits += 1;
                negation_left = 0;
            } else {
                negation_left = negation_left.saturating_sub(1);
            }
            multiplier = 1.0;
        }

        if hits == 0 {
            return 0.0;
        }
        (total / hits as f64).clamp(-1.0, 1.0)
    }
}

/// A record paired with its sentiment.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotated<R> {
    pub record: R,
    pub sentiment_polarity: f64,
    pub sentiment_label: SentimentLabel,
}

impl<R: Record> Record for Annotated<R> {
    type TextField = R::TextField;
    type NumericField = R::NumericField;

    fn columns() -> Vec<&'static str> {
        let mut columns = R::columns();
        columns.extend(["sentiment_polarity", "sentiment_label"]);
        columns
    }

    fn text(&self, field: Self::TextField) -> &str {
        self.record.text(field)
    }

    fn numeric(&self, field: Self::NumericField) -> f64 {
        self.record.numeric(field)
    }

    fn author(&self) -> &str {
        self.record.author()
    }

    fn score(&self) -> i64 {
        self.record.score()
    }

    fn values(&self) -> Vec<String> {
        let mut values = self.record.values();
        values.push(format!("{:.4}", self.sentiment_polarity));
        values.push(self.sentiment_label.to_string());
        values
    }
}

/// The annotated records carrying `label`, in input order.
pub fn filter_by_label<R: Clone>(
    annotated: &[Annotated<R>],
    label: SentimentLabel,
) -> Vec<Annotated<R>> {
    annotated
        .iter()
        .filter(|item| item.sentiment_label == label)
        .cloned()
        .collect()
}

/// Scores `field` of every record and labels it against `thresholds`.
pub fn add_sentiment<R, S>(
    records: &[R],
    field: R::TextField,
    scorer: &S,
    thresholds: &SentimentThresholds,
) -> Vec<Annotated<R>>
where
    R: Record + Clone,
    S: SentimentScorer + ?Sized,
{
    let annotated: Vec<Annotated<R>> = records
        .iter()
        .map(|record| {
            let polarity = scorer.polarity(record.text(field));
            Annotated {
                record: record.clone(),
                sentiment_polarity: polarity,
                sentiment_label: thresholds.label(polarity),
            }
        })
        .collect();

    debug!(
        "Annotated {} records with sentiment from {:?}",
        annotated.len(),
        field
    );
    annotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use redscope_core::{timestamp_from_utc, Comment, CommentTextField};

    fn comment(body: &str) -> Comment {
        Comment {
            id: "c1".to_string(),
            parent_id: "t3_p".to_string(),
            body: body.to_string(),
            author: "someone".to_string(),
            score: 3,
            created_at: timestamp_from_utc(1_700_000_000.0),
        }
    }

    #[test]
    fn test_neutral_text_scores_zero() {
        let scorer = LexiconScorer::new();
        assert_eq!(scorer.polarity(""), 0.0);
        assert_eq!(scorer.polarity("the table is in the kitchen"), 0.0);
    }

    #[test]
    fn test_polarity_sign() {
        let scorer = LexiconScorer::new();
        assert!(scorer.polarity("This is a great library, I love it") > 0.1);
        assert!(scorer.polarity("Terrible docs and awful error messages") < -0.1);
    }

    #[test]
    fn test_intensifier_strengthens() {
        let scorer = LexiconScorer::new();
        let plain = scorer.polarity("good");
        let intensified = scorer.polarity("very good");
        assert!(intensified > plain);
    }

    #[test]
    fn test_negation_flips_with_damping() {
        let scorer = LexiconScorer::new();
        assert!((scorer.polarity("good") - 0.5).abs() < 1e-9);
        assert!((scorer.polarity("not good") + 0.25).abs() < 1e-9);
        assert!((scorer.polarity("isn't good") + 0.25).abs() < 1e-9);
        // The negator only reaches a few tokens forward.
        assert!(scorer.polarity("not the one thing i would call good") > 0.0);
    }

    #[test]
    fn test_typographic_apostrophe_negates() {
        let scorer = LexiconScorer::new();
        assert!((scorer.polarity("don\u{2019}t like") + 0.15).abs() < 1e-9);
        assert_eq!(
            scorer.polarity("isn\u{2019}t good"),
            scorer.polarity("isn't good")
        );
    }

    #[test]
    fn test_label_from_name() {
        assert_eq!("Negative".parse::<SentimentLabel>(), Ok(SentimentLabel::Negative));
        assert_eq!(" neutral ".parse::<SentimentLabel>(), Ok(SentimentLabel::Neutral));
        let err = "meh".parse::<SentimentLabel>().unwrap_err();
        assert_eq!(err.value, "meh");
    }

    #[test]
    fn test_filter_by_label_keeps_order() {
        let annotated = add_sentiment(
            &[comment("love it"), comment("hate it"), comment("great work"), comment("ok")],
            CommentTextField::Body,
            &LexiconScorer::new(),
            &SentimentThresholds::default(),
        );
        let positive = filter_by_label(&annotated, SentimentLabel::Positive);
        let bodies: Vec<&str> = positive.iter().map(|a| a.record.body.as_str()).collect();
        assert_eq!(bodies, vec!["love it", "great work"]);
        assert_eq!(filter_by_label(&annotated, SentimentLabel::Negative).len(), 1);
    }

    #[test]
    fn test_polarity_is_clamped() {
        let scorer = LexiconScorer::new().with_word("peak", 1.0);
        let polarity = scorer.polarity("extremely incredibly peak");
        assert_eq!(polarity, 1.0);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let thresholds = SentimentThresholds::default();
        assert_eq!(thresholds.label(0.1), SentimentLabel::Neutral);
        assert_eq!(thresholds.label(0.11), SentimentLabel::Positive);
        assert_eq!(thresholds.label(-0.1), SentimentLabel::Neutral);
        assert_eq!(thresholds.label(-0.5), SentimentLabel::Negative);
    }

    #[test]
    fn test_add_sentiment_is_deterministic() {
        let records = vec![comment("I love this"), comment("I hate this"), comment("ok")];
        let scorer = LexiconScorer::new();
        let thresholds = SentimentThresholds::default();

        let first = add_sentiment(&records, CommentTextField::Body, &scorer, &thresholds);
        let second = add_sentiment(&records, CommentTextField::Body, &scorer, &thresholds);
        assert_eq!(first, second);

        let labels: Vec<SentimentLabel> = first.iter().map(|a| a.sentiment_label).collect();
        assert_eq!(
            labels,
            vec![
                SentimentLabel::Positive,
                SentimentLabel::Negative,
                SentimentLabel::Neutral
            ]
        );
    }

    #[test]
    fn test_annotated_columns_extend_record() {
        let annotated = add_sentiment(
            &[comment("good")],
            CommentTextField::Body,
            &LexiconScorer::new(),
            &SentimentThresholds::default(),
        );
        let columns = Annotated::<Comment>::columns();
        assert_eq!(columns.len(), Comment::columns().len() + 2);
        assert_eq!(columns[columns.len() - 2..], ["sentiment_polarity", "sentiment_label"]);

        let values = annotated[0].values();
        assert_eq!(values.len(), columns.len());
        assert_eq!(values[values.len() - 2], "0.5000");
        assert_eq!(values[values.len() - 1], "positive");
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<Comment> = Vec::new();
        let annotated = add_sentiment(
            &records,
            CommentTextField::Body,
            &LexiconScorer::new(),
            &SentimentThresholds::default(),
        );
        assert!(annotated.is_empty());
    }
}
