//! Submit service: land an accepted review in its target ref.

use serde::Serialize;

use crate::config::{AppraiseConfig, SubmitStrategy};
use crate::review::{Review, ReviewStatus};
use crate::scm::{AnnotationStore, GitRepo};

use super::reviews::ReviewService;
use super::{CoreError, CoreResult};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Parameters for a submit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions<'a> {
    /// Commit-ish the review is attached to. Defaults to the current review.
    pub revision: Option<&'a str>,
    /// Overrides the configured strategy.
    pub strategy: Option<SubmitStrategy>,
    /// Submit even if the review has not been accepted.
    pub force: bool,
}

/// Result of a submit.
#[derive(Debug, Clone, Serialize)]
pub struct Submitted {
    pub revision: String,
    pub review_ref: String,
    pub target_ref: String,
    pub strategy: SubmitStrategy,
    /// Commit the target ref points at afterwards.
    pub target_commit: String,
}

/// Service for submitting reviews.
pub struct SubmitService<'a> {
    repo: &'a GitRepo,
    config: &'a AppraiseConfig,
}

impl<'a> SubmitService<'a> {
    pub(crate) fn new(repo: &'a GitRepo, config: &'a AppraiseConfig) -> Self {
        Self { repo, config }
    }

    /// Merge or rebase the review's ref into its target ref.
    ///
    /// Refuses to run with a dirty work tree, on a review that already landed,
    /// or (without `force`) on one that is not accepted. Leaves the target ref
    /// checked out.
    pub fn submit(&self, options: SubmitOptions<'_>) -> CoreResult<Submitted> {
        if self.repo.has_uncommitted_changes()? {
            return Err(CoreError::UncommittedChanges);
        }

        let review = self.review(options.revision)?;
        if review.submitted {
            return Err(CoreError::AlreadySubmitted {
                revision: review.revision,
            });
        }
        let status = review.status();
        if status != ReviewStatus::Accepted {
            if !options.force {
                return Err(CoreError::NotAccepted {
                    revision: review.revision,
                    status,
                });
            }
            tracing::warn!(revision = %review.revision, %status, "submitting a review that is not accepted");
        }

        let review_ref = review.request.review_ref.as_str();
        let target_ref = review.request.target_ref.as_str();
        self.repo.resolve_commit(review_ref)?;
        self.repo.resolve_commit(target_ref)?;

        let strategy = options.strategy.unwrap_or(self.config.submit_strategy);
        match strategy {
            SubmitStrategy::FastForward => {
                if !self.repo.is_ancestor(target_ref, review_ref)? {
                    return Err(CoreError::NotFastForward {
                        review_ref: review_ref.to_string(),
                        target_ref: target_ref.to_string(),
                    });
                }
                self.repo.switch_to_ref(target_ref)?;
                self.repo.merge_ref(review_ref, true, None)?;
            }
            SubmitStrategy::Merge => {
                let message = merge_message(&review);
                self.repo.switch_to_ref(target_ref)?;
                self.repo.merge_ref(review_ref, false, Some(&message))?;
            }
            SubmitStrategy::Rebase => {
                if !review_ref.starts_with(BRANCH_REF_PREFIX) {
                    return Err(CoreError::NotABranch {
                        review_ref: review_ref.to_string(),
                    });
                }
                self.repo.switch_to_ref(review_ref)?;
                self.repo
                    .rebase_onto(target_ref, &self.config.notes_pattern)?;
                self.repo.switch_to_ref(target_ref)?;
                self.repo.merge_ref(review_ref, true, None)?;
            }
        }

        let target_commit = self.repo.resolve_commit(target_ref)?;
        tracing::info!(
            revision = %review.revision,
            %review_ref,
            %target_ref,
            %strategy,
            "review submitted"
        );
        Ok(Submitted {
            revision: review.revision.clone(),
            review_ref: review_ref.to_string(),
            target_ref: target_ref.to_string(),
            strategy,
            target_commit,
        })
    }

    fn review(&self, revision: Option<&str>) -> CoreResult<Review> {
        let store: &dyn AnnotationStore = self.repo;
        let reviews = ReviewService::new(store, self.config);
        match revision {
            Some(rev) => {
                let commit = self.repo.resolve_commit(rev)?;
                reviews.require(&commit)
            }
            None => reviews.require_current(),
        }
    }
}

/// `Submitting review <short hash>` followed by the review description.
fn merge_message(review: &Review) -> String {
    let short = review.revision.get(..12).unwrap_or(&review.revision);
    let description = review.request.description.trim();
    if description.is_empty() {
        format!("Submitting review {short}")
    } else {
        format!("Submitting review {short}\n\n{description}")
    }
}
