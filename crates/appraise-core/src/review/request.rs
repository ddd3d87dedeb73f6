//! Review requests stored as notes under the reviews namespace.

use serde::{Deserialize, Serialize};

use super::FORMAT_VERSION;
use crate::scm::Record;

/// Notes namespace holding review requests.
pub const REQUESTS_REF: &str = "refs/notes/devtools/reviews";

/// A request to review the commits on `review_ref` for inclusion in `target_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub review_ref: String,
    #[serde(default)]
    pub target_ref: String,
    #[serde(default)]
    pub requester: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_commit: Option<String>,
    #[serde(default)]
    pub v: u32,
}

impl Request {
    /// Build a new request stamped with the current time.
    #[must_use]
    pub fn new(
        requester: &str,
        review_ref: &str,
        target_ref: &str,
        description: &str,
        reviewers: Vec<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp().to_string(),
            review_ref: review_ref.to_string(),
            target_ref: target_ref.to_string(),
            requester: requester.to_string(),
            reviewers,
            description: description.to_string(),
            base_commit: None,
            v: FORMAT_VERSION,
        }
    }

    pub fn to_record(&self) -> serde_json::Result<Record> {
        serde_json::to_vec(self).map(Record::from)
    }

    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        let bytes = record.trimmed();
        if bytes.is_empty() {
            return None;
        }
        match serde_json::from_slice::<Self>(bytes) {
            Ok(request) if request.v <= FORMAT_VERSION => Some(request),
            Ok(request) => {
                tracing::debug!(v = request.v, "skipping request with unsupported format version");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable request record");
                None
            }
        }
    }
}

/// Decode every valid request in `records`, in log order.
#[must_use]
pub fn decode_requests(records: &[Record]) -> Vec<Request> {
    records.iter().filter_map(Request::from_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_requests_keeps_order_and_skips_invalid() {
        let records = vec![
            Record::from(r#"{"reviewRef":"refs/heads/a","targetRef":"refs/heads/master","description":"one"}"#),
            Record::from("{broken"),
            Record::from(r#"{"reviewRef":"refs/heads/b","targetRef":"refs/heads/master","description":"two","reviewers":["x@example.com"]}"#),
        ];
        let requests = decode_requests(&records);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].review_ref, "refs/heads/a");
        assert_eq!(requests[1].reviewers, vec!["x@example.com".to_string()]);
    }

    #[test]
    fn test_new_request_serializes_camel_case() {
        let request = Request::new(
            "me@example.com",
            "refs/heads/feature",
            "refs/heads/master",
            "Add parser",
            vec![],
        );
        let record = request.to_record().unwrap();
        let text = std::str::from_utf8(record.as_bytes()).unwrap();
        assert!(text.contains(r#""reviewRef":"refs/heads/feature""#));
        assert!(text.contains(r#""targetRef":"refs/heads/master""#));
        assert!(!text.contains("reviewers"));
        assert!(!text.contains("baseCommit"));
        assert_eq!(Request::from_record(&record), Some(request));
    }

    #[test]
    fn test_base_commit_is_stored_as_base_commit_key() {
        let mut request = Request::new(
            "me@example.com",
            "refs/heads/feature",
            "refs/heads/master",
            "",
            vec![],
        );
        request.base_commit = Some("abc123".to_string());
        let record = request.to_record().unwrap();
        let text = std::str::from_utf8(record.as_bytes()).unwrap();
        assert!(text.contains(r#""baseCommit":"abc123""#));
        assert_eq!(
            Request::from_record(&record).and_then(|r| r.base_commit),
            Some("abc123".to_string())
        );
    }
}
