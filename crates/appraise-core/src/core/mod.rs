//! Service layer for appraise-core.
//!
//! Provides typed, high-level APIs for listing and creating reviews, adding
//! comments, submitting accepted reviews, and syncing notes with a remote.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use appraise_core::config::ConfigOverrides;
//! use appraise_core::core::AppraiseContext;
//!
//! let ctx = AppraiseContext::open(Path::new("/repo"), &ConfigOverrides::default()).unwrap();
//! let open = ctx.services().reviews().list_open().unwrap();
//! ```

pub mod comments;
pub mod errors;
pub mod reviews;
pub mod submit;
pub mod sync;

pub use errors::{CoreError, CoreResult};

use std::path::Path;

use crate::config::{AppraiseConfig, ConfigOverrides};
use crate::scm::{detect_git_root, AnnotationStore, GitRepo};

/// A repository plus the configuration resolved for it.
#[derive(Debug, Clone)]
pub struct AppraiseContext {
    repo: GitRepo,
    config: AppraiseConfig,
}

impl AppraiseContext {
    /// Open the git repository containing `start_path` and resolve configuration.
    pub fn open(start_path: &Path, overrides: &ConfigOverrides) -> CoreResult<Self> {
        let root = detect_git_root(start_path).ok_or_else(|| CoreError::NotARepository {
            path: start_path.display().to_string(),
        })?;
        let repo = GitRepo::new(root);
        let config = AppraiseConfig::load(&repo, overrides)?;
        tracing::debug!(root = %repo.root().display(), target = %config.target_ref, "opened repository");
        Ok(Self { repo, config })
    }

    #[must_use]
    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    #[must_use]
    pub fn config(&self) -> &AppraiseConfig {
        &self.config
    }

    /// Review and comment services backed by this repository.
    #[must_use]
    pub fn services(&self) -> AppraiseServices<'_> {
        AppraiseServices::new(&self.repo, &self.config)
    }

    /// Access submit operations. These change the checked out branch.
    #[must_use]
    pub fn submit(&self) -> submit::SubmitService<'_> {
        submit::SubmitService::new(&self.repo, &self.config)
    }

    /// Access sync operations. These need a real git remote.
    #[must_use]
    pub fn sync(&self) -> sync::SyncService<'_> {
        sync::SyncService::new(&self.repo, &self.config)
    }
}

/// The explicit author if given, else the configured one.
pub(crate) fn resolve_author(config: &AppraiseConfig, explicit: Option<&str>) -> CoreResult<String> {
    explicit
        .or(config.author.as_deref())
        .filter(|author| !author.trim().is_empty())
        .map(ToString::to_string)
        .ok_or(CoreError::MissingAuthor)
}

/// Facade over any [`AnnotationStore`].
pub struct AppraiseServices<'a> {
    store: &'a dyn AnnotationStore,
    config: &'a AppraiseConfig,
}

impl<'a> AppraiseServices<'a> {
    #[must_use]
    pub fn new(store: &'a dyn AnnotationStore, config: &'a AppraiseConfig) -> Self {
        Self { store, config }
    }

    /// Access review operations.
    #[must_use]
    pub fn reviews(&self) -> reviews::ReviewService<'a> {
        reviews::ReviewService::new(self.store, self.config)
    }

    /// Access comment operations.
    #[must_use]
    pub fn comments(&self) -> comments::CommentService<'a> {
        comments::CommentService::new(self.store, self.config)
    }

    #[must_use]
    pub fn config(&self) -> &AppraiseConfig {
        self.config
    }
}
