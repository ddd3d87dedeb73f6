//! appraise - distributed code review stored in git notes

use anyhow::Result;
use clap::Parser;
use std::env;

use appraise_cli::cli::commands::{
    run_accept, run_comment, run_list, run_pull, run_push, run_reject, run_request, run_show,
    run_submit, CommentArgs,
};
use appraise_cli::cli::{Cli, Commands};
use appraise_cli::logging;
use appraise_cli::output::OutputFormat;
use appraise_core::config::ConfigOverrides;
use appraise_core::core::AppraiseContext;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let start = match &cli.path {
        Some(path) => path.clone(),
        None => env::current_dir()?,
    };
    let overrides = ConfigOverrides {
        author: cli.author.clone(),
        ..ConfigOverrides::default()
    };
    let ctx = AppraiseContext::open(&start, &overrides)?;
    let author = cli.author.as_deref();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Commands::List { all, status } => {
            run_list(&ctx, all, status, format)?;
        }

        Commands::Show { revision, diff } => {
            run_show(&ctx, revision.as_deref(), diff, format)?;
        }

        Commands::Request {
            target,
            source,
            message,
            reviewers,
        } => {
            run_request(
                &ctx,
                source.as_deref(),
                target.as_deref(),
                &message,
                reviewers,
                author,
                format,
            )?;
        }

        Commands::Comment {
            message,
            parent,
            lgtm,
            needs_work,
            file,
            line,
            revision,
        } => {
            let args = CommentArgs {
                revision,
                message,
                parent,
                lgtm,
                needs_work,
                file,
                line,
            };
            run_comment(&ctx, &args, author, format)?;
        }

        Commands::Accept { message } => {
            run_accept(&ctx, &message, author, format)?;
        }

        Commands::Reject { message } => {
            run_reject(&ctx, &message, author, format)?;
        }

        Commands::Submit {
            revision,
            strategy,
            force,
        } => {
            run_submit(&ctx, revision.as_deref(), strategy, force, format)?;
        }

        Commands::Pull { remote } => {
            run_pull(&ctx, remote.as_deref(), format)?;
        }

        Commands::Push { remote } => {
            run_push(&ctx, remote.as_deref(), format)?;
        }
    }

    Ok(())
}
