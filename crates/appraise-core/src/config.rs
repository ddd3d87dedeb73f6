//! Configuration resolution.
//!
//! Each setting is taken from the first source that provides it: explicit
//! override (CLI flag), environment variable, git config, built-in default.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::review::{COMMENTS_REF, REQUESTS_REF};
use crate::scm::{validate_anchor, GitRepo};

/// Notes refs pushed and pulled by sync.
pub const NOTES_REF_PATTERN: &str = "refs/notes/devtools/*";

pub const DEFAULT_TARGET_REF: &str = "refs/heads/master";
pub const DEFAULT_REMOTE: &str = "origin";

pub const AUTHOR_ENV: &str = "APPRAISE_AUTHOR";
pub const TARGET_ENV: &str = "APPRAISE_TARGET";
pub const REMOTE_ENV: &str = "APPRAISE_REMOTE";
pub const SUBMIT_ENV: &str = "APPRAISE_SUBMIT";

/// Git config key for the default target ref.
pub const TARGET_CONFIG_KEY: &str = "appraise.target";
/// Git config key for the default submit strategy.
pub const SUBMIT_CONFIG_KEY: &str = "appraise.submit";

/// How an accepted review lands in its target ref.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SubmitStrategy {
    /// Move the target forward to the review ref; refuse if it has diverged.
    #[default]
    FastForward,
    /// Always create a merge commit.
    Merge,
    /// Rebase the review ref onto the target, then fast-forward.
    Rebase,
}

impl SubmitStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FastForward => "fast-forward",
            Self::Merge => "merge",
            Self::Rebase => "rebase",
        }
    }
}

impl fmt::Display for SubmitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "fast-forward" | "ff" => Ok(Self::FastForward),
            "merge" => Ok(Self::Merge),
            "rebase" => Ok(Self::Rebase),
            other => bail!("unknown submit strategy '{other}' (expected fast-forward, merge, or rebase)"),
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub author: Option<String>,
    pub target_ref: Option<String>,
    pub remote: Option<String>,
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppraiseConfig {
    pub requests_ref: String,
    pub comments_ref: String,
    pub notes_pattern: String,
    pub target_ref: String,
    pub remote: String,
    /// `None` when no identity is configured anywhere; only writes need it.
    pub author: Option<String>,
    pub submit_strategy: SubmitStrategy,
}

impl Default for AppraiseConfig {
    fn default() -> Self {
        Self {
            requests_ref: REQUESTS_REF.to_string(),
            comments_ref: COMMENTS_REF.to_string(),
            notes_pattern: NOTES_REF_PATTERN.to_string(),
            target_ref: DEFAULT_TARGET_REF.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            author: None,
            submit_strategy: SubmitStrategy::default(),
        }
    }
}

impl AppraiseConfig {
    /// Resolve configuration from the process environment and `repo`'s git config.
    pub fn load(repo: &GitRepo, overrides: &ConfigOverrides) -> Result<Self> {
        Self::resolve(
            overrides,
            |name| env::var(name).ok(),
            |key| repo.config_value(key),
        )
    }

    /// Resolve configuration from explicit lookup functions.
    pub fn resolve<E, G>(overrides: &ConfigOverrides, env_var: E, git_config: G) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
        G: Fn(&str) -> Result<Option<String>>,
    {
        let env_var = |name: &str| env_var(name).filter(|v| !v.trim().is_empty());

        let author = match overrides.author.clone().or_else(|| env_var(AUTHOR_ENV)) {
            Some(author) => Some(author),
            None => git_config("user.email").context("Failed to read user.email")?,
        };

        let target_ref = match overrides.target_ref.clone().or_else(|| env_var(TARGET_ENV)) {
            Some(target) => target,
            None => git_config(TARGET_CONFIG_KEY)
                .with_context(|| format!("Failed to read {TARGET_CONFIG_KEY}"))?
                .unwrap_or_else(|| DEFAULT_TARGET_REF.to_string()),
        };
        validate_anchor(&target_ref).context("Invalid target ref")?;

        let remote = overrides
            .remote
            .clone()
            .or_else(|| env_var(REMOTE_ENV))
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());
        validate_anchor(&remote).context("Invalid remote name")?;

        let configured_strategy = match env_var(SUBMIT_ENV) {
            Some(value) => Some(value),
            None => git_config(SUBMIT_CONFIG_KEY)
                .with_context(|| format!("Failed to read {SUBMIT_CONFIG_KEY}"))?,
        };
        let submit_strategy = match configured_strategy {
            Some(value) => value.parse().unwrap_or_else(|e: anyhow::Error| {
                tracing::warn!(error = %e, "ignoring configured submit strategy");
                SubmitStrategy::default()
            }),
            None => SubmitStrategy::default(),
        };

        Ok(Self {
            target_ref,
            remote,
            author,
            submit_strategy,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config =
            AppraiseConfig::resolve(&ConfigOverrides::default(), |_| None, |_| Ok(None)).unwrap();
        assert_eq!(config.target_ref, DEFAULT_TARGET_REF);
        assert_eq!(config.remote, DEFAULT_REMOTE);
        assert_eq!(config.requests_ref, "refs/notes/devtools/reviews");
        assert_eq!(config.comments_ref, "refs/notes/devtools/discuss");
        assert_eq!(config.author, None);
    }

    #[test]
    fn test_git_config_beats_default() {
        let git = lookup(&[
            ("user.email", "me@example.com"),
            ("appraise.target", "refs/heads/main"),
        ]);
        let config = AppraiseConfig::resolve(
            &ConfigOverrides::default(),
            |_| None,
            |key| Ok(git.get(key).cloned()),
        )
        .unwrap();
        assert_eq!(config.author.as_deref(), Some("me@example.com"));
        assert_eq!(config.target_ref, "refs/heads/main");
    }

    #[test]
    fn test_env_beats_git_config_and_flag_beats_env() {
        let git = lookup(&[("user.email", "git@example.com")]);
        let vars = lookup(&[
            (AUTHOR_ENV, "env@example.com"),
            (TARGET_ENV, "refs/heads/release"),
            (REMOTE_ENV, "upstream"),
        ]);

        let config = AppraiseConfig::resolve(
            &ConfigOverrides::default(),
            |name| vars.get(name).cloned(),
            |key| Ok(git.get(key).cloned()),
        )
        .unwrap();
        assert_eq!(config.author.as_deref(), Some("env@example.com"));
        assert_eq!(config.target_ref, "refs/heads/release");
        assert_eq!(config.remote, "upstream");

        let overrides = ConfigOverrides {
            author: Some("flag@example.com".to_string()),
            target_ref: None,
            remote: Some("fork".to_string()),
        };
        let config = AppraiseConfig::resolve(
            &overrides,
            |name| vars.get(name).cloned(),
            |key| Ok(git.get(key).cloned()),
        )
        .unwrap();
        assert_eq!(config.author.as_deref(), Some("flag@example.com"));
        assert_eq!(config.remote, "fork");
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let vars = lookup(&[(REMOTE_ENV, "  ")]);
        let config = AppraiseConfig::resolve(
            &ConfigOverrides::default(),
            |name| vars.get(name).cloned(),
            |_| Ok(None),
        )
        .unwrap();
        assert_eq!(config.remote, DEFAULT_REMOTE);
    }

    #[test]
    fn test_submit_strategy_sources() {
        let config =
            AppraiseConfig::resolve(&ConfigOverrides::default(), |_| None, |_| Ok(None)).unwrap();
        assert_eq!(config.submit_strategy, SubmitStrategy::FastForward);

        let git = lookup(&[(SUBMIT_CONFIG_KEY, "merge")]);
        let config = AppraiseConfig::resolve(
            &ConfigOverrides::default(),
            |_| None,
            |key| Ok(git.get(key).cloned()),
        )
        .unwrap();
        assert_eq!(config.submit_strategy, SubmitStrategy::Merge);

        let vars = lookup(&[(SUBMIT_ENV, "rebase")]);
        let config = AppraiseConfig::resolve(
            &ConfigOverrides::default(),
            |name| vars.get(name).cloned(),
            |key| Ok(git.get(key).cloned()),
        )
        .unwrap();
        assert_eq!(config.submit_strategy, SubmitStrategy::Rebase);
    }

    #[test]
    fn test_unknown_submit_strategy_falls_back_to_default() {
        let git = lookup(&[(SUBMIT_CONFIG_KEY, "squash")]);
        let config = AppraiseConfig::resolve(
            &ConfigOverrides::default(),
            |_| None,
            |key| Ok(git.get(key).cloned()),
        )
        .unwrap();
        assert_eq!(config.submit_strategy, SubmitStrategy::FastForward);
        assert!("squash".parse::<SubmitStrategy>().is_err());
        assert_eq!("ff".parse::<SubmitStrategy>().unwrap(), SubmitStrategy::FastForward);
    }

    #[test]
    fn test_invalid_target_rejected() {
        let overrides = ConfigOverrides {
            target_ref: Some("--upload-pack=x".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(AppraiseConfig::resolve(&overrides, |_| None, |_| Ok(None)).is_err());
    }
}
