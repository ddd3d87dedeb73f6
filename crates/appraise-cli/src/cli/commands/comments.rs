//! Implementation of `appraise comment`, `accept`, and `reject`.

use anyhow::Result;
use serde::Serialize;

use crate::cli::commands::helpers::review_for;
use crate::output::{quoted, short_hash, Formatter, OutputFormat, TextOutput};
use appraise_core::core::comments::{AddedComment, NewComment};
use appraise_core::core::AppraiseContext;
use appraise_core::review::{Location, Resolution};

/// Arguments of `appraise comment`.
#[derive(Debug, Default)]
pub struct CommentArgs {
    pub revision: Option<String>,
    pub message: String,
    pub parent: Option<String>,
    pub lgtm: bool,
    pub needs_work: bool,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl CommentArgs {
    fn resolution(&self) -> Resolution {
        match (self.lgtm, self.needs_work) {
            (true, _) => Resolution::Accepted,
            (false, true) => Resolution::NeedsWork,
            (false, false) => Resolution::Unset,
        }
    }

    fn location(&self, revision: &str) -> Option<Location> {
        self.file.as_ref().map(|path| Location {
            commit: revision.to_string(),
            path: path.clone(),
            start_line: self.line,
        })
    }
}

#[derive(Serialize)]
struct CommentOutput {
    revision: String,
    hash: String,
    author: String,
    status: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    parent: String,
    description: String,
}

impl TextOutput for CommentOutput {
    fn to_text(&self) -> String {
        let target = if self.parent.is_empty() {
            format!("on {}", short_hash(&self.revision))
        } else {
            format!("in reply to {}", short_hash(&self.parent))
        };
        let mut text = format!("Comment {} {target} [{}]", short_hash(&self.hash), self.status);
        if !self.description.is_empty() {
            text.push_str(&format!(" {}", quoted(&self.description)));
        }
        text
    }
}

impl From<AddedComment> for CommentOutput {
    fn from(added: AddedComment) -> Self {
        Self {
            revision: added.revision,
            hash: added.comment.hash,
            author: added.comment.author,
            status: added.comment.resolved.comment_status(),
            parent: added.comment.parent,
            description: added.comment.description,
        }
    }
}

/// Comment on a review, or reply to a comment with `--parent`.
#[tracing::instrument(skip(ctx, args, format))]
pub fn run_comment(
    ctx: &AppraiseContext,
    args: &CommentArgs,
    author: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let review = review_for(ctx, args.revision.as_deref())?;

    let added = ctx.services().comments().add(
        &review.revision,
        NewComment {
            description: &args.message,
            parent: args.parent.as_deref(),
            resolved: args.resolution(),
            location: args.location(&review.revision),
            author,
        },
    )?;

    let formatter = Formatter::new(format);
    formatter.print(&CommentOutput::from(added))?;

    Ok(())
}

/// Accept the current review.
#[tracing::instrument(skip(ctx, message, format))]
pub fn run_accept(
    ctx: &AppraiseContext,
    message: &str,
    author: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let added = ctx.services().comments().accept(message, author)?;
    Formatter::new(format).print(&CommentOutput::from(added))
}

/// Reject the current review.
#[tracing::instrument(skip(ctx, message, format))]
pub fn run_reject(
    ctx: &AppraiseContext,
    message: &str,
    author: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let added = ctx.services().comments().reject(message, author)?;
    Formatter::new(format).print(&CommentOutput::from(added))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_args_resolution() {
        let mut args = CommentArgs::default();
        assert_eq!(args.resolution(), Resolution::Unset);
        args.needs_work = true;
        assert_eq!(args.resolution(), Resolution::NeedsWork);
        args.needs_work = false;
        args.lgtm = true;
        assert_eq!(args.resolution(), Resolution::Accepted);
    }

    #[test]
    fn test_comment_text() {
        let mut output = CommentOutput {
            revision: "0123456789abcdef".to_string(),
            hash: "fedcba9876543210".to_string(),
            author: "bob@example.com".to_string(),
            status: "lgtm",
            parent: String::new(),
            description: "ship it".to_string(),
        };
        assert_eq!(
            output.to_text(),
            "Comment fedcba987654 on 0123456789ab [lgtm] \"ship it\""
        );

        output.parent = "aaaaaaaaaaaaaaaa".to_string();
        output.description.clear();
        assert_eq!(output.to_text(), "Comment fedcba987654 in reply to aaaaaaaaaaaa [lgtm]");
    }

    #[test]
    fn test_comment_args_location() {
        let mut args = CommentArgs::default();
        assert!(args.location("abc").is_none());

        args.file = Some("src/lib.rs".to_string());
        args.line = Some(12);
        let location = args.location("abc").unwrap();
        assert_eq!(location.commit, "abc");
        assert_eq!(location.path, "src/lib.rs");
        assert_eq!(location.start_line, Some(12));
    }
}
