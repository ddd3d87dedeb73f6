//! Implementation of `appraise submit`.

use anyhow::Result;

use crate::output::{short_hash, Formatter, OutputFormat, TextOutput};
use appraise_core::config::SubmitStrategy;
use appraise_core::core::submit::{SubmitOptions, Submitted};
use appraise_core::core::AppraiseContext;

impl TextOutput for Submitted {
    fn to_text(&self) -> String {
        format!(
            "Submitted review {} ({}): {} is now at {}",
            short_hash(&self.revision),
            self.strategy,
            self.target_ref,
            short_hash(&self.target_commit)
        )
    }
}

/// Land the review on `revision` (default: the current review) in its target ref.
#[tracing::instrument(skip(ctx, format))]
pub fn run_submit(
    ctx: &AppraiseContext,
    revision: Option<&str>,
    strategy: Option<SubmitStrategy>,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let submitted = ctx.submit().submit(SubmitOptions {
        revision,
        strategy,
        force,
    })?;
    Formatter::new(format).print(&submitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitted_text() {
        let submitted = Submitted {
            revision: "0123456789abcdef".to_string(),
            review_ref: "refs/heads/feature".to_string(),
            target_ref: "refs/heads/master".to_string(),
            strategy: SubmitStrategy::Merge,
            target_commit: "fedcba9876543210".to_string(),
        };
        assert_eq!(
            submitted.to_text(),
            "Submitted review 0123456789ab (merge): refs/heads/master is now at fedcba987654"
        );
    }
}
