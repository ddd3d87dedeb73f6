//! In-process annotation store with a tiny commit graph.
//!
//! Behaves like [`GitRepo`](super::GitRepo) for everything the review layer
//! needs, without spawning git. Useful in tests and for embedding.

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{validate_notes_ref, AnnotationStore, Record, RecordsByRevision};

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Commit ids in creation order, which doubles as topological order.
    commits: Vec<String>,
    parents: HashMap<String, Vec<String>>,
    refs: HashMap<String, String>,
    head: String,
    notes: RefCell<BTreeMap<String, RecordsByRevision>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit. Parents must already exist.
    pub fn commit(&mut self, id: &str, parents: &[&str]) -> Result<()> {
        if self.parents.contains_key(id) {
            bail!("commit already exists: {id}");
        }
        for parent in parents {
            if !self.parents.contains_key(*parent) {
                bail!("unknown parent commit: {parent}");
            }
        }
        self.commits.push(id.to_string());
        self.parents.insert(
            id.to_string(),
            parents.iter().map(ToString::to_string).collect(),
        );
        Ok(())
    }

    /// Point `name` (e.g. `refs/heads/master`) at `commit`.
    pub fn set_ref(&mut self, name: &str, commit: &str) -> Result<()> {
        if !self.parents.contains_key(commit) {
            bail!("unknown commit: {commit}");
        }
        self.refs.insert(name.to_string(), commit.to_string());
        Ok(())
    }

    /// Make `name` the current working ref.
    pub fn checkout(&mut self, name: &str) {
        self.head = name.to_string();
    }

    fn resolve(&self, rev: &str) -> Option<&str> {
        if let Some(commit) = self.refs.get(rev) {
            return Some(commit);
        }
        self.parents.get_key_value(rev).map(|(id, _)| id.as_str())
    }

    /// `rev` and everything reachable from it.
    fn reachable(&self, rev: &str) -> HashSet<&str> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self.resolve(rev).into_iter().collect();
        while let Some(commit) = stack.pop() {
            if !seen.insert(commit) {
                continue;
            }
            if let Some(parents) = self.parents.get(commit) {
                stack.extend(parents.iter().map(String::as_str));
            }
        }
        seen
    }
}

impl AnnotationStore for MemoryStore {
    fn list_annotated_revisions(&self, notes_ref: &str) -> Result<Vec<String>> {
        validate_notes_ref(notes_ref)?;
        Ok(self
            .notes
            .borrow()
            .get(notes_ref)
            .map(|by_rev| by_rev.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read_records(&self, notes_ref: &str, revision: &str) -> Result<Vec<Record>> {
        validate_notes_ref(notes_ref)?;
        Ok(self
            .notes
            .borrow()
            .get(notes_ref)
            .and_then(|by_rev| by_rev.get(revision))
            .cloned()
            .unwrap_or_default())
    }

    fn append_record(&self, notes_ref: &str, revision: &str, record: &Record) -> Result<()> {
        validate_notes_ref(notes_ref)?;
        let Some(commit) = self.resolve(revision) else {
            bail!("unknown revision: {revision}");
        };
        self.notes
            .borrow_mut()
            .entry(notes_ref.to_string())
            .or_default()
            .entry(commit.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let Some(ancestor) = self.resolve(ancestor) else {
            return Ok(false);
        };
        Ok(self.reachable(descendant).contains(ancestor))
    }

    fn current_working_ref(&self) -> Result<String> {
        if self.head.is_empty() {
            bail!("no ref is checked out");
        }
        Ok(self.head.clone())
    }

    fn commits_between(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let excluded = self.reachable(from);
        let included = self.reachable(to);
        Ok(self
            .commits
            .iter()
            .filter(|c| included.contains(c.as_str()) && !excluded.contains(c.as_str()))
            .cloned()
            .collect())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let left = self.reachable(a);
        let right = self.reachable(b);
        // Creation order is topological, so the last shared commit is the best one.
        Ok(self
            .commits
            .iter()
            .rev()
            .find(|c| left.contains(c.as_str()) && right.contains(c.as_str()))
            .cloned())
    }
}
