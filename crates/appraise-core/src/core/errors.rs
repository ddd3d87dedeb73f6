//! Typed error types for the appraise-core service layer.

use thiserror::Error;

/// Result type alias for core service operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the appraise-core service layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The working directory is not inside a git repository.
    #[error("Not a git repository: {path}")]
    NotARepository { path: String },

    /// More than one open review targets the current ref.
    #[error("There are {count} open reviews for the ref \"{review_ref}\"")]
    AmbiguousReview { count: usize, review_ref: String },

    /// No review request is attached to the revision.
    #[error("No review found for revision {revision}")]
    ReviewNotFound { revision: String },

    /// The current ref has no open review.
    #[error("There is no open review for the ref \"{review_ref}\"")]
    NoCurrentReview { review_ref: String },

    /// The review ref has no commits beyond the target.
    #[error("There are no commits in {review_ref} that are not already in {target_ref}")]
    NothingToReview {
        review_ref: String,
        target_ref: String,
    },

    /// A reply names a parent comment that does not exist on the revision.
    #[error("Comment {hash} not found on revision {revision}")]
    CommentNotFound { hash: String, revision: String },

    /// Submitting needs a clean work tree.
    #[error("You have uncommitted or untracked files. Use `git stash -u` to save them before submitting")]
    UncommittedChanges,

    /// The review has already landed in its target ref.
    #[error("The review on {revision} has already been submitted")]
    AlreadySubmitted { revision: String },

    /// Only accepted reviews may be submitted without `--force`.
    #[error("Not submitting the review on {revision}: it is {status}, not accepted")]
    NotAccepted {
        revision: String,
        status: crate::review::ReviewStatus,
    },

    /// A fast-forward submit was requested but the target has moved on.
    #[error("Refusing to submit a non-fast-forward review. First merge {target_ref} into {review_ref}, or submit with the merge or rebase strategy")]
    NotFastForward {
        review_ref: String,
        target_ref: String,
    },

    /// Rebasing needs a branch to move.
    #[error("Cannot rebase {review_ref}: it is not a branch under refs/heads/")]
    NotABranch { review_ref: String },

    /// A write was attempted without an author identity.
    #[error("No author identity. Use --author, set APPRAISE_AUTHOR, or run 'git config user.email <email>'")]
    MissingAuthor,

    /// A git, protocol, or serialization error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(anyhow::Error::new(err).context("Failed to serialize record"))
    }
}
