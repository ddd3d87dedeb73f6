//! Sync service: push and pull review notes.

use crate::config::AppraiseConfig;
use crate::scm::GitRepo;

use super::{CoreError, CoreResult};

/// Result of a pull.
#[derive(Debug, Clone)]
pub struct PullResult {
    pub remote: String,
    /// Local notes refs that received the remote's notes.
    pub merged_refs: Vec<String>,
}

/// Service for sync operations.
pub struct SyncService<'a> {
    repo: &'a GitRepo,
    config: &'a AppraiseConfig,
}

impl<'a> SyncService<'a> {
    pub(crate) fn new(repo: &'a GitRepo, config: &'a AppraiseConfig) -> Self {
        Self { repo, config }
    }

    /// Push every review notes ref to `remote` (default: the configured remote).
    ///
    /// Returns the remote that was pushed to.
    pub fn push(&self, remote: Option<&str>) -> CoreResult<String> {
        let remote = remote.unwrap_or(self.config.remote.as_str());
        self.repo
            .push_notes(remote, &self.config.notes_pattern)
            .map_err(CoreError::Internal)?;
        tracing::info!(%remote, "pushed review notes");
        Ok(remote.to_string())
    }

    /// Fetch review notes from `remote` and merge them into the local refs.
    pub fn pull(&self, remote: Option<&str>) -> CoreResult<PullResult> {
        let remote = remote.unwrap_or(self.config.remote.as_str());
        let merged_refs = self
            .repo
            .pull_notes(remote, &self.config.notes_pattern)
            .map_err(CoreError::Internal)?;
        tracing::info!(%remote, merged = merged_refs.len(), "pulled review notes");
        Ok(PullResult {
            remote: remote.to_string(),
            merged_refs,
        })
    }
}
