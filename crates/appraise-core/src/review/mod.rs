//! Review domain model.
//!
//! Requests and comments are immutable records in two notes namespaces. A
//! [`Review`] is rebuilt from them on every read: the request, the comment
//! forest for the same revision, and the statuses derived from both.

pub mod comment;
pub mod format;
pub mod request;
pub mod resolution;
pub mod thread;

pub use comment::{decode_comments, Comment, Location, COMMENTS_REF};
pub use request::{decode_requests, Request, REQUESTS_REF};
pub use resolution::{Resolution, ReviewStatus};
pub use thread::{build_threads, resolve_threads, CommentThread};

use serde::Serialize;

use crate::scm::Record;

/// Highest record format version this crate understands.
pub const FORMAT_VERSION: u32 = 0;

/// Full state of one code review.
///
/// `resolved` says whether reviewers accepted the change; `submitted` says
/// whether it has landed in the target ref. The two are independent.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    /// Commit the request is attached to.
    pub revision: String,
    pub request: Request,
    pub comments: Vec<CommentThread>,
    pub resolved: Resolution,
    pub submitted: bool,
}

impl Review {
    /// Assemble a review from its request and the raw comment records of its revision.
    ///
    /// `submitted` comes from the caller's ancestry check.
    #[must_use]
    pub fn assemble(
        revision: String,
        request: Request,
        comment_records: &[Record],
        submitted: bool,
    ) -> Self {
        let mut comments = build_threads(decode_comments(comment_records));
        let resolved = resolve_threads(&mut comments);
        Self {
            revision,
            request,
            comments,
            resolved,
            submitted,
        }
    }

    #[must_use]
    pub fn status(&self) -> ReviewStatus {
        self.resolved.into()
    }

    /// One-line summary, see [`format::summary`].
    #[must_use]
    pub fn summary(&self) -> String {
        format::summary(self)
    }

    /// Summary followed by every comment thread, see [`format::details`].
    #[must_use]
    pub fn details(&self) -> String {
        format::details(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request {
            timestamp: "1".to_string(),
            review_ref: "refs/heads/feature".to_string(),
            target_ref: "refs/heads/master".to_string(),
            requester: "dev@example.com".to_string(),
            reviewers: vec![],
            description: "Add feature".to_string(),
            base_commit: None,
            v: 0,
        }
    }

    #[test]
    fn test_assemble_links_replies_by_hash() {
        let root = r#"{"timestamp":"10","author":"r","description":"looks good","resolved":true}"#;
        let root_hash = comment::record_hash(root.as_bytes());
        let reply = format!(
            r#"{{"timestamp":"20","author":"d","description":"thanks","parent":"{root_hash}"}}"#
        );
        let records = vec![Record::from(reply.as_str()), Record::from(root)];

        let review = Review::assemble("abc123".to_string(), request(), &records, false);
        assert_eq!(review.comments.len(), 1);
        assert_eq!(review.comments[0].children.len(), 1);
        assert_eq!(review.resolved, Resolution::Accepted);
        assert_eq!(review.status(), ReviewStatus::Accepted);
    }

    #[test]
    fn test_assemble_without_comments_is_pending() {
        let review = Review::assemble("abc123".to_string(), request(), &[], true);
        assert!(review.comments.is_empty());
        assert_eq!(review.status(), ReviewStatus::Pending);
        assert!(review.submitted);
    }
}
