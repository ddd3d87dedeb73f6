//! Implementation of `appraise list`, `show`, and `request`.

use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};

use crate::cli::commands::helpers::{diff_range, review_for};
use crate::output::{quoted, short_hash, Formatter, OutputFormat, TextOutput};
use appraise_core::core::reviews::NewRequest;
use appraise_core::core::AppraiseContext;
use appraise_core::review::ReviewStatus;

/// List reviews, open ones only unless `all` is set.
#[tracing::instrument(skip(ctx, format))]
pub fn run_list(
    ctx: &AppraiseContext,
    all: bool,
    status: Option<ReviewStatus>,
    format: OutputFormat,
) -> Result<()> {
    let reviews = ctx.services().reviews().list_filtered(all, status)?;
    let empty_message = if all { "No reviews" } else { "No open reviews" };

    let formatter = Formatter::new(format);
    formatter.print_reviews(
        &reviews,
        empty_message,
        &["appraise show <revision>", "appraise comment -m \"...\" <revision>"],
    )?;

    Ok(())
}

#[derive(Serialize)]
struct DiffOutput {
    revision: String,
    base: String,
    head: String,
    diff: String,
}

impl TextOutput for DiffOutput {
    fn to_text(&self) -> String {
        self.diff.clone()
    }
}

/// Show a review with its comment threads, or the diff under review.
#[tracing::instrument(skip(ctx, format))]
pub fn run_show(
    ctx: &AppraiseContext,
    revision: Option<&str>,
    diff: bool,
    format: OutputFormat,
) -> Result<()> {
    let review = review_for(ctx, revision)?;
    let formatter = Formatter::new(format);

    if !diff {
        return formatter.print_review(&review, true);
    }

    let (base, head) = diff_range(ctx, &review);
    let text = ctx.repo().diff(&base, &head)?;
    match format {
        OutputFormat::Json => formatter.print(&DiffOutput {
            revision: review.revision,
            base,
            head,
            diff: text,
        })?,
        OutputFormat::Text => {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{text}")?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct RequestOutput {
    revision: String,
    review_ref: String,
    target_ref: String,
    requester: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reviewers: Vec<String>,
    description: String,
}

impl TextOutput for RequestOutput {
    fn to_text(&self) -> String {
        let mut text = format!(
            "Requested review {} of {} into {}",
            short_hash(&self.revision),
            self.review_ref,
            self.target_ref
        );
        if !self.reviewers.is_empty() {
            text.push_str(&format!("\n  reviewers: {}", self.reviewers.join(", ")));
        }
        if !self.description.is_empty() {
            text.push_str(&format!("\n  {}", quoted(&self.description)));
        }
        text
    }
}

/// Request a review of `source` (default: the checked out ref) against `target`.
#[tracing::instrument(skip(ctx, message, format))]
pub fn run_request(
    ctx: &AppraiseContext,
    source: Option<&str>,
    target: Option<&str>,
    message: &str,
    reviewers: Vec<String>,
    author: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let reviewers = reviewers
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    let created = ctx.services().reviews().request(NewRequest {
        review_ref: source,
        target_ref: target,
        description: message,
        reviewers,
        requester: author,
    })?;

    let output = RequestOutput {
        revision: created.revision,
        review_ref: created.request.review_ref,
        target_ref: created.request.target_ref,
        requester: created.request.requester,
        reviewers: created.request.reviewers,
        description: created.request.description,
    };

    let formatter = Formatter::new(format);
    formatter.print(&output)?;

    Ok(())
}
