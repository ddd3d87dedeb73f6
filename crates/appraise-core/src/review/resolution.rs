//! Tri-state resolution shared by comments, threads, and reviews.

use serde::{Deserialize, Serialize};

/// Verdict carried by a comment, or aggregated over a thread or review.
///
/// Stored on the wire as an optional boolean: `true` is accepted, `false`
/// needs work, and an absent field is informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Resolution {
    /// No verdict (FYI).
    #[default]
    Unset,
    /// LGTM.
    Accepted,
    /// Needs work.
    NeedsWork,
}

impl Resolution {
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(*self, Self::Unset)
    }

    /// Status word for a single comment.
    #[must_use]
    pub const fn comment_status(self) -> &'static str {
        match self {
            Self::Unset => "fyi",
            Self::Accepted => "lgtm",
            Self::NeedsWork => "needs work",
        }
    }

    /// Presence-aware conjunction over a sequence of verdicts.
    ///
    /// Unset entries are skipped. The result is `Unset` when nothing else was
    /// seen, `NeedsWork` if any entry needs work, and `Accepted` otherwise.
    pub fn conjunction<I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut any_present = false;
        let mut all_accepted = true;
        for verdict in verdicts {
            match verdict {
                Self::Unset => {}
                Self::Accepted => any_present = true,
                Self::NeedsWork => {
                    any_present = true;
                    all_accepted = false;
                }
            }
        }
        match (any_present, all_accepted) {
            (false, _) => Self::Unset,
            (true, true) => Self::Accepted,
            (true, false) => Self::NeedsWork,
        }
    }
}

impl From<Option<bool>> for Resolution {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Unset,
            Some(true) => Self::Accepted,
            Some(false) => Self::NeedsWork,
        }
    }
}

impl From<Resolution> for Option<bool> {
    fn from(value: Resolution) -> Self {
        match value {
            Resolution::Unset => None,
            Resolution::Accepted => Some(true),
            Resolution::NeedsWork => Some(false),
        }
    }
}

/// Review-level status derived from the aggregate resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ReviewStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ReviewStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl From<Resolution> for ReviewStatus {
    fn from(value: Resolution) -> Self {
        match value {
            Resolution::Unset => Self::Pending,
            Resolution::Accepted => Self::Accepted,
            Resolution::NeedsWork => Self::Rejected,
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
