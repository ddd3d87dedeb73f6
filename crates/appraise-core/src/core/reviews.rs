//! Review service: list, get, find the current review, request a review.

use crate::config::AppraiseConfig;
use crate::review::{decode_requests, Request, Review, ReviewStatus};
use crate::scm::{validate_anchor, AnnotationStore, Record};

use super::{resolve_author, CoreError, CoreResult};

/// Parameters for a new review request.
#[derive(Debug, Clone, Default)]
pub struct NewRequest<'a> {
    /// Ref under review. Defaults to the current working ref.
    pub review_ref: Option<&'a str>,
    /// Ref the change is destined for. Defaults to the configured target.
    pub target_ref: Option<&'a str>,
    pub description: &'a str,
    pub reviewers: Vec<String>,
    /// Requester identity. Defaults to the configured author.
    pub requester: Option<&'a str>,
}

/// Result of creating a review request.
#[derive(Debug, Clone)]
pub struct CreatedRequest {
    /// Commit the request was attached to.
    pub revision: String,
    pub request: Request,
}

/// Service for review operations.
pub struct ReviewService<'a> {
    store: &'a dyn AnnotationStore,
    config: &'a AppraiseConfig,
}

impl<'a> ReviewService<'a> {
    pub(crate) fn new(store: &'a dyn AnnotationStore, config: &'a AppraiseConfig) -> Self {
        Self { store, config }
    }

    /// Every review in the repository, submitted or not.
    ///
    /// Reads each notes namespace once in bulk. Reviews come back in revision
    /// order of the bulk mapping; a revision with several requests yields one
    /// review per request.
    pub fn list_all(&self) -> CoreResult<Vec<Review>> {
        let requests = self.store.read_all_records(&self.config.requests_ref)?;
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let comments = self.store.read_all_records(&self.config.comments_ref)?;
        tracing::debug!(
            requests = requests.len(),
            commented = comments.len(),
            "read review notes"
        );

        let mut reviews = Vec::new();
        for (revision, records) in &requests {
            let comment_records = comments.get(revision).map_or(&[][..], Vec::as_slice);
            for request in decode_requests(records) {
                reviews.push(self.assemble(revision, request, comment_records)?);
            }
        }
        Ok(reviews)
    }

    /// Reviews that have not landed in their target ref.
    pub fn list_open(&self) -> CoreResult<Vec<Review>> {
        let mut reviews = self.list_all()?;
        reviews.retain(|review| !review.submitted);
        Ok(reviews)
    }

    /// Open reviews (or all, with `include_submitted`), optionally narrowed by status.
    pub fn list_filtered(
        &self,
        include_submitted: bool,
        status: Option<ReviewStatus>,
    ) -> CoreResult<Vec<Review>> {
        let mut reviews = if include_submitted {
            self.list_all()?
        } else {
            self.list_open()?
        };
        if let Some(status) = status {
            reviews.retain(|review| review.status() == status);
        }
        Ok(reviews)
    }

    /// The open review whose review ref is the ref currently checked out.
    ///
    /// Returns `Ok(None)` when nothing matches and
    /// `Err(CoreError::AmbiguousReview)` when more than one does.
    pub fn get_current(&self) -> CoreResult<Option<Review>> {
        let current_ref = self.store.current_working_ref()?;
        let mut matches: Vec<Review> = self
            .list_open()?
            .into_iter()
            .filter(|review| review.request.review_ref == current_ref)
            .collect();
        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(CoreError::AmbiguousReview {
                count,
                review_ref: current_ref,
            }),
        }
    }

    /// Like [`get_current`](Self::get_current), but a missing review is an error.
    pub fn require_current(&self) -> CoreResult<Review> {
        match self.get_current()? {
            Some(review) => Ok(review),
            None => Err(CoreError::NoCurrentReview {
                review_ref: self.store.current_working_ref()?,
            }),
        }
    }

    /// The review attached to `revision`, if any.
    ///
    /// Reads only that revision's notes. With several requests on the
    /// revision, the first valid one wins.
    pub fn get(&self, revision: &str) -> CoreResult<Option<Review>> {
        let records = self
            .store
            .read_records(&self.config.requests_ref, revision)?;
        let Some(request) = decode_requests(&records).into_iter().next() else {
            return Ok(None);
        };
        let comments = self
            .store
            .read_records(&self.config.comments_ref, revision)?;
        self.assemble(revision, request, &comments).map(Some)
    }

    /// Like [`get`](Self::get), but a missing review is an error.
    pub fn require(&self, revision: &str) -> CoreResult<Review> {
        self.get(revision)?
            .ok_or_else(|| CoreError::ReviewNotFound {
                revision: revision.to_string(),
            })
    }

    /// Request a review of the commits in `target..review`.
    ///
    /// The request is attached to the oldest of those commits and records the
    /// merge base of the two refs as its base commit.
    pub fn request(&self, params: NewRequest<'_>) -> CoreResult<CreatedRequest> {
        let requester = resolve_author(self.config, params.requester)?;
        let review_ref = match params.review_ref {
            Some(review_ref) => review_ref.to_string(),
            None => self.store.current_working_ref()?,
        };
        let target_ref = params
            .target_ref
            .unwrap_or(self.config.target_ref.as_str());
        validate_anchor(&review_ref)?;
        validate_anchor(target_ref)?;

        let commits = self.store.commits_between(target_ref, &review_ref)?;
        let Some(revision) = commits.into_iter().next() else {
            return Err(CoreError::NothingToReview {
                review_ref,
                target_ref: target_ref.to_string(),
            });
        };

        let mut request = Request::new(
            &requester,
            &review_ref,
            target_ref,
            params.description,
            params.reviewers,
        );
        request.base_commit = self.store.merge_base(target_ref, &review_ref)?;
        let record: Record = request.to_record()?;
        self.store
            .append_record(&self.config.requests_ref, &revision, &record)?;
        tracing::info!(%revision, %review_ref, %target_ref, "review requested");

        Ok(CreatedRequest { revision, request })
    }

    fn assemble(
        &self,
        revision: &str,
        request: Request,
        comment_records: &[Record],
    ) -> CoreResult<Review> {
        let submitted = self.store.is_ancestor(revision, &request.target_ref)?;
        Ok(Review::assemble(
            revision.to_string(),
            request,
            comment_records,
            submitted,
        ))
    }
}
