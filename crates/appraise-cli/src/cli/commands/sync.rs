//! Implementation of `appraise push` and `pull`.

use anyhow::Result;
use serde::Serialize;

use crate::output::{Formatter, OutputFormat, TextOutput};
use appraise_core::core::AppraiseContext;

#[derive(Serialize)]
struct SyncOutput {
    action: &'static str,
    remote: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    merged: Vec<String>,
}

impl TextOutput for SyncOutput {
    fn to_text(&self) -> String {
        let mut text = match self.action {
            "push" => format!("Pushed review notes to {}", self.remote),
            _ => format!("Pulled review notes from {}", self.remote),
        };
        for notes_ref in &self.merged {
            text.push_str(&format!("\n  merged {notes_ref}"));
        }
        text
    }
}

/// Push review notes to `remote`.
#[tracing::instrument(skip(ctx, format))]
pub fn run_push(ctx: &AppraiseContext, remote: Option<&str>, format: OutputFormat) -> Result<()> {
    let remote = ctx.sync().push(remote)?;

    let output = SyncOutput {
        action: "push",
        remote,
        merged: Vec::new(),
    };
    Formatter::new(format).print(&output)
}

/// Fetch review notes from `remote` and merge them into the local notes.
#[tracing::instrument(skip(ctx, format))]
pub fn run_pull(ctx: &AppraiseContext, remote: Option<&str>, format: OutputFormat) -> Result<()> {
    let pulled = ctx.sync().pull(remote)?;

    let output = SyncOutput {
        action: "pull",
        remote: pulled.remote,
        merged: pulled.merged_refs,
    };
    Formatter::new(format).print(&output)
}
