//! Comment service: add comments and replies, accept or reject the current review.

use crate::config::AppraiseConfig;
use crate::review::comment::record_hash;
use crate::review::{decode_comments, Comment, Location, Resolution};
use crate::scm::AnnotationStore;

use super::reviews::ReviewService;
use super::{resolve_author, CoreError, CoreResult};

/// Parameters for a new comment.
#[derive(Debug, Clone, Default)]
pub struct NewComment<'a> {
    pub description: &'a str,
    /// Hash, or unique hash prefix, of the comment being replied to.
    pub parent: Option<&'a str>,
    pub resolved: Resolution,
    pub location: Option<Location>,
    /// Author identity. Defaults to the configured author.
    pub author: Option<&'a str>,
}

/// Result of adding a comment.
#[derive(Debug, Clone)]
pub struct AddedComment {
    /// Revision the comment was attached to.
    pub revision: String,
    /// The stored comment, with its hash filled in.
    pub comment: Comment,
}

/// Service for comment operations.
pub struct CommentService<'a> {
    store: &'a dyn AnnotationStore,
    config: &'a AppraiseConfig,
}

impl<'a> CommentService<'a> {
    pub(crate) fn new(store: &'a dyn AnnotationStore, config: &'a AppraiseConfig) -> Self {
        Self { store, config }
    }

    /// Add a comment to the review on `revision`.
    ///
    /// A parent, when given, must name an existing comment on the same revision.
    pub fn add(&self, revision: &str, params: NewComment<'_>) -> CoreResult<AddedComment> {
        let author = resolve_author(self.config, params.author)?;

        let mut comment = Comment::new(&author, params.description);
        comment.resolved = params.resolved;
        comment.location = params.location;
        if let Some(parent) = params.parent {
            comment.parent = self.find_parent(revision, parent)?;
        }

        let record = comment.to_record()?;
        self.store
            .append_record(&self.config.comments_ref, revision, &record)?;
        comment.hash = record_hash(record.trimmed());
        tracing::info!(%revision, hash = %comment.hash, "comment added");

        Ok(AddedComment {
            revision: revision.to_string(),
            comment,
        })
    }

    /// Add a root comment with an accepting verdict to the current review.
    pub fn accept(&self, description: &str, author: Option<&str>) -> CoreResult<AddedComment> {
        self.add_verdict(Resolution::Accepted, description, author)
    }

    /// Add a root comment asking for more work to the current review.
    pub fn reject(&self, description: &str, author: Option<&str>) -> CoreResult<AddedComment> {
        self.add_verdict(Resolution::NeedsWork, description, author)
    }

    fn add_verdict(
        &self,
        resolved: Resolution,
        description: &str,
        author: Option<&str>,
    ) -> CoreResult<AddedComment> {
        let review = ReviewService::new(self.store, self.config).require_current()?;
        self.add(
            &review.revision,
            NewComment {
                description,
                resolved,
                author,
                ..NewComment::default()
            },
        )
    }

    /// Resolve `wanted` to the full hash of a comment on `revision`.
    fn find_parent(&self, revision: &str, wanted: &str) -> CoreResult<String> {
        let records = self
            .store
            .read_records(&self.config.comments_ref, revision)?;
        let not_found = || CoreError::CommentNotFound {
            hash: wanted.to_string(),
            revision: revision.to_string(),
        };
        if wanted.is_empty() {
            return Err(not_found());
        }

        let mut matches = decode_comments(&records)
            .into_iter()
            .map(|comment| comment.hash)
            .filter(|hash| hash.starts_with(wanted));
        match (matches.next(), matches.next()) {
            (Some(hash), None) => Ok(hash),
            _ => Err(not_found()),
        }
    }
}
