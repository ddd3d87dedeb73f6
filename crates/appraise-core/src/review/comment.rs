//! Review comments stored as notes under the discussion namespace.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::resolution::Resolution;
use super::FORMAT_VERSION;
use crate::scm::Record;

/// Notes namespace holding comments.
pub const COMMENTS_REF: &str = "refs/notes/devtools/discuss";

/// Where in the change a comment points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
}

/// A single comment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Content-derived identity. Filled in by [`decode_comments`]; never serialized.
    #[serde(skip)]
    pub hash: String,
    /// Epoch seconds, as text.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Hash of the comment being replied to; empty for a root comment.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Resolution::is_unset")]
    pub resolved: Resolution,
    #[serde(default)]
    pub v: u32,
}

impl Comment {
    /// Build a new comment stamped with the current time.
    #[must_use]
    pub fn new(author: &str, description: &str) -> Self {
        Self {
            hash: String::new(),
            timestamp: chrono::Utc::now().timestamp().to_string(),
            author: author.to_string(),
            location: None,
            parent: String::new(),
            description: description.to_string(),
            resolved: Resolution::Unset,
            v: FORMAT_VERSION,
        }
    }

    /// Serialize to the single-line JSON form appended to the notes log.
    pub fn to_record(&self) -> serde_json::Result<Record> {
        serde_json::to_vec(self).map(Record::from)
    }

    /// Decode one record, returning `None` if it is not a valid comment.
    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        let bytes = record.trimmed();
        if bytes.is_empty() {
            return None;
        }
        let mut comment: Self = match serde_json::from_slice(bytes) {
            Ok(comment) => comment,
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable comment record");
                return None;
            }
        };
        if comment.v > FORMAT_VERSION {
            tracing::debug!(v = comment.v, "skipping comment with unsupported format version");
            return None;
        }
        comment.hash = record_hash(bytes);
        Some(comment)
    }
}

/// Hex SHA-256 of a record's bytes.
#[must_use]
pub fn record_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Decode every valid comment in `records`, keyed by hash.
///
/// Undecodable records are skipped. The result keeps first-seen order; a
/// repeated hash replaces the earlier entry in place.
#[must_use]
pub fn decode_comments(records: &[Record]) -> Vec<Comment> {
    let mut out: Vec<Comment> = Vec::with_capacity(records.len());
    let mut index = std::collections::HashMap::new();
    for comment in records.iter().filter_map(Comment::from_record) {
        match index.get(&comment.hash) {
            Some(&slot) => out[slot] = comment,
            None => {
                index.insert(comment.hash.clone(), out.len());
                out.push(comment);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_skips_garbage_and_blank_lines() {
        let records = vec![
            Record::from(r#"{"timestamp":"100","author":"a","description":"first"}"#),
            Record::from(""),
            Record::from("not json at all"),
            Record::from(r#"{"timestamp":"200","author":"b","description":"second","resolved":false}"#),
        ];
        let comments = decode_comments(&records);
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].description, "first");
        assert_eq!(comments[1].resolved, Resolution::NeedsWork);
        assert_eq!(comments[0].hash.len(), 64);
    }

    #[test]
    fn test_decode_rejects_future_version() {
        let records = vec![Record::from(r#"{"timestamp":"1","description":"x","v":7}"#)];
        assert!(decode_comments(&records).is_empty());
    }

    #[test]
    fn test_identical_records_collapse_to_one_comment() {
        let line = r#"{"timestamp":"1","author":"a","description":"dup"}"#;
        let records = vec![Record::from(line), Record::from(line)];
        let comments = decode_comments(&records);
        assert_eq!(comments.len(), 1);
    }

    #[test]
    fn test_hash_is_content_derived() {
        let a = Comment::from_record(&Record::from(r#"{"description":"a"}"#)).unwrap();
        let b = Comment::from_record(&Record::from(r#"{"description":"a"}"#)).unwrap();
        let c = Comment::from_record(&Record::from(r#"{"description":"c"}"#)).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
    }

    #[test]
    fn test_record_round_trip_keeps_fields() {
        let mut comment = Comment::new("reviewer@example.com", "please rename");
        comment.parent = "abc".to_string();
        comment.resolved = Resolution::NeedsWork;
        comment.location = Some(Location {
            commit: "deadbeef".to_string(),
            path: "src/lib.rs".to_string(),
            start_line: Some(12),
        });

        let record = comment.to_record().unwrap();
        let text = String::from_utf8(record.as_bytes().to_vec()).unwrap();
        assert!(!text.contains('\n'));
        assert!(text.contains(r#""startLine":12"#));
        assert!(!text.contains("hash"));

        let decoded = Comment::from_record(&record).unwrap();
        assert_eq!(decoded.parent, "abc");
        assert_eq!(decoded.resolved, Resolution::NeedsWork);
        assert_eq!(decoded.location, comment.location);
        assert_eq!(decoded.hash, record_hash(record.as_bytes()));
    }
}
