use redscope_core::{CoreError, Record};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Writes a header row followed by one row per record.
pub fn write_csv<R, W>(writer: W, records: &[R]) -> Result<(), CoreError>
where
    R: Record,
    W: Write,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(R::columns())?;
    for record in records {
        csv_writer.write_record(record.values())?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_file<R: Record, P: AsRef<Path>>(path: P, records: &[R]) -> Result<(), CoreError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_csv(file, records)?;
    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use redscope_core::{timestamp_from_utc, Post};

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: id.to_string(),
            title: title.to_string(),
            score: 10,
            author: "writer".to_string(),
            num_comments: 2,
            created_at: timestamp_from_utc(1_640_995_200.0),
            url: "https://example.com".to_string(),
            selftext: String::new(),
            permalink: format!("https://www.reddit.com/comments/{}/", id),
        }
    }

    #[test]
    fn test_header_and_rows() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[post("a1", "Plain"), post("b2", "Hello, world")]).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "id,title,score,author,num_comments,created_at,url,selftext,permalink"
        );
        assert!(lines[2].starts_with("b2,\"Hello, world\",10,writer,2,2022-01-01T00:00:00Z,"));
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let mut buffer = Vec::new();
        let records: Vec<Post> = Vec::new();
        write_csv(&mut buffer, &records).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 1);
    }
}
