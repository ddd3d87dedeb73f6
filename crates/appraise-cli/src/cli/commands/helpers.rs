//! Shared helpers for CLI commands.

use anyhow::{Context, Result};

use appraise_core::core::AppraiseContext;
use appraise_core::review::Review;

/// The review on `revision`, or the current review when no revision is given.
///
/// `revision` may be any commit-ish; it is resolved to a full hash first.
pub fn review_for(ctx: &AppraiseContext, revision: Option<&str>) -> Result<Review> {
    let reviews = ctx.services().reviews();
    let review = match revision {
        Some(rev) => {
            let commit = ctx
                .repo()
                .resolve_commit(rev)
                .with_context(|| format!("Unknown revision: {rev}"))?;
            reviews.require(&commit)?
        }
        None => reviews.require_current()?,
    };
    Ok(review)
}

/// Commit range shown by `show --diff`: from the request's base (or the
/// parent of the reviewed revision) to the tip of the review ref.
pub fn diff_range(ctx: &AppraiseContext, review: &Review) -> (String, String) {
    let base = review
        .request
        .base_commit
        .clone()
        .unwrap_or_else(|| format!("{}^", review.revision));
    let head = ctx
        .repo()
        .resolve_commit(&review.request.review_ref)
        .unwrap_or_else(|_| review.revision.clone());
    (base, head)
}
