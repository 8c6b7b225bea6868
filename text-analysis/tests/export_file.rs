use redscope_core::{timestamp_from_utc, Comment, CommentTextField};
use tempfile::TempDir;
use text_analysis::{add_sentiment, write_csv_file, LexiconScorer, SentimentThresholds};

fn comments() -> Vec<Comment> {
    vec![
        Comment {
            id: "c1".to_string(),
            parent_id: "t3_abc".to_string(),
            body: "I love it, really".to_string(),
            author: "alice".to_string(),
            score: 12,
            created_at: timestamp_from_utc(1_700_000_000.0),
        },
        Comment {
            id: "c2".to_string(),
            parent_id: "t1_c1".to_string(),
            body: "Said \"no\"\nthen left".to_string(),
            author: "bob".to_string(),
            score: -3,
            created_at: timestamp_from_utc(1_700_000_060.0),
        },
    ]
}

#[test]
fn test_comment_csv_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("comments.csv");

    write_csv_file(&path, &comments()).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["id", "parent_id", "body", "author", "score", "created_at"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][2], "I love it, really");
    assert_eq!(&rows[1][2], "Said \"no\"\nthen left");
    assert_eq!(&rows[1][5], "2023-11-14T22:14:20Z");
}

#[test]
fn test_annotated_csv_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("annotated.csv");
    let annotated = add_sentiment(
        &comments(),
        CommentTextField::Body,
        &LexiconScorer::new(),
        &SentimentThresholds::default(),
    );

    write_csv_file(&path, &annotated).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 8);
    assert_eq!(&headers[6], "sentiment_polarity");
    assert_eq!(&headers[7], "sentiment_label");

    let first = reader.records().next().unwrap().unwrap();
    assert_eq!(&first[7], "positive");
}

#[test]
fn test_missing_directory_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("out.csv");
    let err = write_csv_file(&path, &comments()).unwrap_err();
    assert!(matches!(err, redscope_core::CoreError::Io(_)));
}
