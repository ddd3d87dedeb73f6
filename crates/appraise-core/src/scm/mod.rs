use anyhow::{bail, Result};
use std::collections::BTreeMap;

pub mod batch;
pub mod git;
pub mod memory;

pub use git::{detect_git_root, GitRepo};
pub use memory::MemoryStore;

/// One line of a note: an opaque, immutable log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record(Vec<u8>);

impl Record {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Bytes with surrounding ASCII whitespace removed.
    #[must_use]
    pub fn trimmed(&self) -> &[u8] {
        self.0.trim_ascii()
    }

    /// Split a note blob into records, one per line.
    #[must_use]
    pub fn split_lines(content: &[u8]) -> Vec<Self> {
        content
            .split(|&b| b == b'\n')
            .map(|line| Self(line.to_vec()))
            .collect()
    }
}

impl From<Vec<u8>> for Record {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for Record {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

/// Mapping from annotated revision to its records, in revision order.
pub type RecordsByRevision = BTreeMap<String, Vec<Record>>;

/// Append-only annotation log keyed by notes ref and revision.
///
/// All methods block until the underlying store answers.
pub trait AnnotationStore {
    /// Commits that carry at least one note under `notes_ref`.
    fn list_annotated_revisions(&self, notes_ref: &str) -> Result<Vec<String>>;

    /// Records attached to `revision`, in append order. Empty if none.
    fn read_records(&self, notes_ref: &str, revision: &str) -> Result<Vec<Record>>;

    /// Records for every annotated commit under `notes_ref`.
    ///
    /// The default asks for each revision in turn; stores that can answer in
    /// bulk should override it.
    fn read_all_records(&self, notes_ref: &str) -> Result<RecordsByRevision> {
        let mut out = RecordsByRevision::new();
        for revision in self.list_annotated_revisions(notes_ref)? {
            let records = self.read_records(notes_ref, &revision)?;
            out.insert(revision, records);
        }
        Ok(out)
    }

    /// Append one record to the log of `revision`.
    fn append_record(&self, notes_ref: &str, revision: &str, record: &Record) -> Result<()>;

    /// Whether `ancestor` is reachable from `descendant`.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// The ref currently checked out, e.g. `refs/heads/feature`.
    fn current_working_ref(&self) -> Result<String>;

    /// Commits reachable from `to` but not from `from`, oldest first.
    fn commits_between(&self, from: &str, to: &str) -> Result<Vec<String>>;

    /// Best common ancestor of `a` and `b`; `None` for unrelated histories.
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;
}

pub fn validate_anchor(anchor: &str) -> Result<()> {
    if anchor.trim().is_empty() {
        bail!("git revision/ref cannot be empty");
    }

    if anchor.starts_with('-') {
        bail!("git revision/ref cannot start with '-': {anchor}");
    }

    if anchor.contains('\0') || anchor.contains('\n') || anchor.contains('\r') {
        bail!("git revision/ref contains invalid control characters");
    }

    Ok(())
}

pub fn validate_notes_ref(notes_ref: &str) -> Result<()> {
    validate_anchor(notes_ref)?;
    if !notes_ref.starts_with("refs/notes/") {
        bail!("notes ref must live under refs/notes/: {notes_ref}");
    }
    if notes_ref.contains("..") || notes_ref.contains(' ') {
        bail!("invalid notes ref: {notes_ref}");
    }
    Ok(())
}
