//! CLI command definitions and handlers.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use appraise_core::config::SubmitStrategy;
use appraise_core::review::ReviewStatus;

pub mod commands;

/// Distributed code review stored in git notes
#[derive(Parser, Debug)]
#[command(name = "appraise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Override author identity (default: $APPRAISE_AUTHOR or git user.email)
    #[arg(long, global = true)]
    pub author: Option<String>,

    /// Repository to operate on (default: current directory)
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List open reviews
    List {
        /// Include reviews already merged into their target
        #[arg(long)]
        all: bool,

        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<ReviewStatus>,
    },

    /// Show a review and its comments
    Show {
        /// Revision the review is attached to (default: current review)
        revision: Option<String>,

        /// Show the diff under review instead of the comments
        #[arg(long)]
        diff: bool,
    },

    /// Request a review of the current branch
    Request {
        /// Ref the change is destined for (default: $APPRAISE_TARGET, appraise.target, refs/heads/master)
        #[arg(long)]
        target: Option<String>,

        /// Ref to review (default: the ref checked out)
        #[arg(long)]
        source: Option<String>,

        /// Review description
        #[arg(short, long, default_value = "")]
        message: String,

        /// Comma-separated list of reviewers
        #[arg(long, value_delimiter = ',')]
        reviewers: Vec<String>,
    },

    /// Comment on a review
    Comment {
        /// Comment text
        #[arg(short, long)]
        message: String,

        /// Hash (or unique prefix) of the comment to reply to
        #[arg(long)]
        parent: Option<String>,

        /// Mark the comment as accepting the change
        #[arg(long, conflicts_with = "needs_work")]
        lgtm: bool,

        /// Mark the comment as asking for changes
        #[arg(long)]
        needs_work: bool,

        /// File the comment refers to
        #[arg(long)]
        file: Option<String>,

        /// Line in --file the comment refers to
        #[arg(long, requires = "file")]
        line: Option<u32>,

        /// Revision the review is attached to (default: current review)
        revision: Option<String>,
    },

    /// Accept the current review
    Accept {
        /// Optional message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Reject the current review
    Reject {
        /// Optional message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Merge an accepted review into its target ref
    Submit {
        /// Revision the review is attached to (default: current review)
        revision: Option<String>,

        /// How to land the change (default: $APPRAISE_SUBMIT, appraise.submit, fast-forward)
        #[arg(long, value_enum)]
        strategy: Option<SubmitStrategy>,

        /// Submit even if the review has not been accepted
        #[arg(long)]
        force: bool,
    },

    /// Fetch review notes from a remote and merge them
    Pull {
        /// Remote name (default: $APPRAISE_REMOTE or origin)
        remote: Option<String>,
    },

    /// Push review notes to a remote
    Push {
        /// Remote name (default: $APPRAISE_REMOTE or origin)
        remote: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_with_status() {
        let cli = Cli::try_parse_from(["appraise", "--json", "list", "--all", "--status", "accepted"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::List { all, status } => {
                assert!(all);
                assert_eq!(status, Some(ReviewStatus::Accepted));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_request_reviewers() {
        let cli = Cli::try_parse_from([
            "appraise",
            "request",
            "-m",
            "Add feature",
            "--reviewers",
            "a@example.com,b@example.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Request {
                reviewers, message, ..
            } => {
                assert_eq!(reviewers, vec!["a@example.com", "b@example.com"]);
                assert_eq!(message, "Add feature");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_comment_verdict_flags_conflict() {
        assert!(
            Cli::try_parse_from(["appraise", "comment", "-m", "x", "--lgtm", "--needs-work"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["appraise", "comment", "-m", "x", "--line", "3"]).is_err());
    }

    #[test]
    fn test_parse_submit() {
        let cli = Cli::try_parse_from(["appraise", "submit", "--strategy", "fast-forward"]).unwrap();
        match cli.command {
            Commands::Submit {
                revision,
                strategy,
                force,
            } => {
                assert_eq!(revision, None);
                assert_eq!(strategy, Some(SubmitStrategy::FastForward));
                assert!(!force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["appraise", "submit", "--strategy", "squash"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["appraise", "push", "upstream", "-vv", "--author", "me"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.author.as_deref(), Some("me"));
        match cli.command {
            Commands::Push { remote } => assert_eq!(remote.as_deref(), Some("upstream")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
