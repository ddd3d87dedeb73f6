use anyhow::{anyhow, bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::scm::batch::{self, BATCH_CHECK_FORMAT, BATCH_CONTENTS_FORMAT};
use crate::scm::{validate_anchor, validate_notes_ref, AnnotationStore, Record, RecordsByRevision};

/// Strategy used by `git notes merge` when pulling.
const NOTES_MERGE_STRATEGY: &str = "cat_sort_uniq";

const BRANCH_REF_PREFIX: &str = "refs/heads/";

#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Open the repository containing `start_path`.
    pub fn discover(start_path: &Path) -> Result<Self> {
        let root = detect_git_root(start_path).ok_or_else(|| {
            anyhow!(
                "Not a git repository: {}\n  To fix: run inside a git work tree, or pass --path",
                start_path.display()
            )
        })?;
        Ok(Self::new(root))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.root).args(args);
        cmd
    }

    fn spawn_error(args: &[&str]) -> String {
        if let Err(e) = which::which("git") {
            format!("git command not found. Please install git: {e}")
        } else {
            format!("Failed to execute git command: {args:?}")
        }
    }

    /// Run git and return its raw output, whatever the exit status.
    fn run_git_output(&self, args: &[&str]) -> Result<Output> {
        self.command(args)
            .output()
            .with_context(|| Self::spawn_error(args))
    }

    fn run_git_bytes(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.run_git_output(args)?;
        check_status(args, &output)?;
        Ok(output.stdout)
    }

    fn run_git(&self, args: &[&str]) -> Result<String> {
        let stdout = self.run_git_bytes(args)?;
        String::from_utf8(stdout).context("git output was not valid UTF-8")
    }

    /// Run git with `input` on stdin. Stdin is fed from a helper thread so a
    /// large batch cannot deadlock against a full stdout pipe.
    fn run_git_with_stdin(&self, args: &[&str], input: Vec<u8>) -> Result<Vec<u8>> {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| Self::spawn_error(args))?;

        let mut stdin = child
            .stdin
            .take()
            .context("Failed to open stdin of git process")?;
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for git command: {args:?}"))?;
        let written = writer
            .join()
            .map_err(|_| anyhow!("stdin writer for git {args:?} panicked"))?;

        check_status(args, &output)?;
        written.with_context(|| format!("Failed to write stdin of git command: {args:?}"))?;
        Ok(output.stdout)
    }

    fn maybe_symbolic_ref_head(&self) -> Option<String> {
        let output = self
            .run_git_output(&["symbolic-ref", "--quiet", "HEAD"])
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8(output.stdout).ok()?;
        let value = stdout.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn current_commit(&self) -> Result<String> {
        let output = self
            .run_git(&["rev-parse", "HEAD"])
            .context("Failed to get current commit")?;
        Ok(output.trim().to_string())
    }

    /// Resolve a ref or revision to a commit hash.
    pub fn resolve_commit(&self, rev: &str) -> Result<String> {
        validate_anchor(rev)?;
        let rev = rev.strip_prefix("detached:").unwrap_or(rev);
        let spec = format!("{rev}^{{commit}}");
        let output = self
            .run_git(&["rev-parse", "--verify", "--end-of-options", &spec])
            .with_context(|| format!("Failed to resolve commit for {rev}"))?;
        Ok(output.trim().to_string())
    }

    pub fn diff(&self, from: &str, to: &str) -> Result<String> {
        validate_anchor(from)?;
        validate_anchor(to)?;
        let range = format!("{from}..{to}");
        self.run_git(&["diff", "--no-color", &range])
            .with_context(|| format!("Failed to diff from {from} to {to}"))
    }

    /// Read a single git config value; `None` when the key is unset.
    pub fn config_value(&self, key: &str) -> Result<Option<String>> {
        let args = ["config", "--get", key];
        let output = self.run_git_output(&args)?;
        // Exit status 1 means the key is not set.
        if output.status.code() == Some(1) {
            return Ok(None);
        }
        check_status(&args, &output)?;
        let value = String::from_utf8(output.stdout)
            .context("git config output was not valid UTF-8")?
            .trim()
            .to_string();
        Ok((!value.is_empty()).then_some(value))
    }

    /// Push every notes ref matching `pattern` to `remote`.
    pub fn push_notes(&self, remote: &str, pattern: &str) -> Result<()> {
        validate_anchor(remote)?;
        let refspec = format!("{pattern}:{pattern}");
        self.run_git(&["push", remote, &refspec])
            .with_context(|| format!("Failed to push to the remote '{remote}'"))?;
        Ok(())
    }

    /// Fetch notes refs matching `pattern` from `remote` into a remote-tracking
    /// namespace and merge each one into its local ref.
    ///
    /// Returns the local refs that were merged.
    pub fn pull_notes(&self, remote: &str, pattern: &str) -> Result<Vec<String>> {
        validate_anchor(remote)?;
        let tracking_pattern = remote_notes_ref(remote, pattern);
        let refspec = format!("+{pattern}:{tracking_pattern}");
        self.run_git(&["fetch", remote, &refspec])
            .with_context(|| format!("Failed to fetch notes from '{remote}'"))?;

        let listing = self
            .run_git(&["ls-remote", remote, pattern])
            .with_context(|| format!("Failed to list notes refs on '{remote}'"))?;

        let mut merged = Vec::new();
        for line in listing.lines() {
            let Some((_, notes_ref)) = line.split_once('\t') else {
                continue;
            };
            let tracking = remote_notes_ref(remote, notes_ref);
            self.run_git(&[
                "notes",
                "--ref",
                notes_ref,
                "merge",
                &tracking,
                "-s",
                NOTES_MERGE_STRATEGY,
            ])
            .with_context(|| format!("Failed to merge {tracking} into {notes_ref}"))?;
            merged.push(notes_ref.to_string());
        }
        Ok(merged)
    }

    /// Whether the work tree or index has changes that are not committed.
    pub fn has_uncommitted_changes(&self) -> Result<bool> {
        let status = self
            .run_git(&["status", "--porcelain"])
            .context("Failed to read work tree status")?;
        Ok(!status.trim().is_empty())
    }

    /// Check out `git_ref`. Branch refs are checked out by name so HEAD stays attached.
    pub fn switch_to_ref(&self, git_ref: &str) -> Result<()> {
        validate_anchor(git_ref)?;
        let name = git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref);
        self.run_git(&["checkout", "-q", name])
            .with_context(|| format!("Failed to check out {git_ref}"))?;
        Ok(())
    }

    /// Merge `git_ref` into the checked out branch.
    ///
    /// With `fast_forward` the branch may only move forward; otherwise a merge
    /// commit is always created, carrying `message` when given.
    pub fn merge_ref(&self, git_ref: &str, fast_forward: bool, message: Option<&str>) -> Result<()> {
        validate_anchor(git_ref)?;
        let mut args = vec!["merge", "-q"];
        if fast_forward {
            args.extend(["--ff", "--ff-only"]);
        } else {
            args.extend(["--no-ff", "--no-edit"]);
        }
        if let Some(message) = message {
            args.extend(["-m", message]);
        }
        args.push(git_ref);
        self.run_git(&args)
            .with_context(|| format!("Failed to merge {git_ref}"))?;
        Ok(())
    }

    /// Rebase the checked out branch onto `upstream`.
    ///
    /// Notes under `notes_pattern` are copied to the rewritten commits. A
    /// rebase that stops on a conflict is aborted, leaving the branch as it was.
    pub fn rebase_onto(&self, upstream: &str, notes_pattern: &str) -> Result<()> {
        validate_anchor(upstream)?;
        let rewrite = format!("notes.rewriteRef={notes_pattern}");
        if let Err(e) = self.run_git(&["-c", &rewrite, "rebase", "-q", upstream]) {
            if let Err(abort) = self.run_git(&["rebase", "--abort"]) {
                tracing::warn!(error = %abort, "failed to abort rebase");
            }
            return Err(e.context(format!("Failed to rebase onto {upstream}")));
        }
        Ok(())
    }

    /// Raw `git notes list` pairs for `notes_ref`.
    fn notes_list(&self, notes_ref: &str) -> Result<Vec<batch::NoteEntry>> {
        validate_notes_ref(notes_ref)?;
        let out = self
            .run_git_bytes(&["notes", "--ref", notes_ref, "list"])
            .with_context(|| format!("Failed to list notes under {notes_ref}"))?;
        batch::parse_notes_list(&out)
            .with_context(|| format!("Failed to parse the note list of {notes_ref}"))
    }

    fn commit_ids<'a, I>(&self, objects: I) -> Result<std::collections::HashSet<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let check = self
            .run_git_with_stdin(&["cat-file", BATCH_CHECK_FORMAT], batch::batch_input(objects))
            .context("Failure performing a batch type check")?;
        batch::parse_batch_check(&check).context("Failure parsing the output of a batch type check")
    }
}

fn check_status(args: &[&str], output: &Output) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git command {:?} failed with status {}: {}",
            args,
            output.status,
            stderr.trim()
        );
    }
    Ok(())
}

/// `refs/notes/devtools/*` fetched from `origin` lands in `refs/notes/origin/devtools/*`.
#[must_use]
pub fn remote_notes_ref(remote: &str, local_ref: &str) -> String {
    let relative = local_ref.strip_prefix("refs/notes/").unwrap_or(local_ref);
    format!("refs/notes/{remote}/{relative}")
}

#[must_use]
pub fn detect_git_root(start_path: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .current_dir(start_path)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8(output.stdout).ok()?;
    let root = stdout.trim();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

impl AnnotationStore for GitRepo {
    fn list_annotated_revisions(&self, notes_ref: &str) -> Result<Vec<String>> {
        let entries = self.notes_list(notes_ref)?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let commits = self.commit_ids(entries.iter().map(|e| e.object.as_str()))?;
        Ok(entries
            .into_iter()
            .filter(|e| commits.contains(&e.object))
            .map(|e| e.object)
            .collect())
    }

    fn read_records(&self, notes_ref: &str, revision: &str) -> Result<Vec<Record>> {
        validate_notes_ref(notes_ref)?;
        validate_anchor(revision)?;
        let output = self.run_git_output(&["notes", "--ref", notes_ref, "show", revision])?;
        if !output.status.success() {
            // `git notes show` fails when the revision has no note.
            tracing::debug!(notes_ref, revision, "no notes for revision");
            return Ok(Vec::new());
        }
        Ok(Record::split_lines(&output.stdout))
    }

    fn read_all_records(&self, notes_ref: &str) -> Result<RecordsByRevision> {
        let entries = self.notes_list(notes_ref)?;
        if entries.is_empty() {
            return Ok(RecordsByRevision::new());
        }

        let commits = self.commit_ids(entries.iter().map(|e| e.object.as_str()))?;
        let wanted: Vec<&batch::NoteEntry> = entries
            .iter()
            .filter(|e| commits.contains(&e.object))
            .collect();
        if wanted.is_empty() {
            return Ok(RecordsByRevision::new());
        }

        let contents = self
            .run_git_with_stdin(
                &["cat-file", BATCH_CONTENTS_FORMAT],
                batch::batch_input(wanted.iter().map(|e| e.blob.as_str())),
            )
            .context("Failure performing a batch file read")?;
        let contents = batch::parse_batch_contents(&contents)
            .context("Failure parsing the output of a batch file read")?;

        tracing::debug!(
            notes_ref,
            annotated = entries.len(),
            commits = wanted.len(),
            "read notes in bulk"
        );
        Ok(batch::zip_records(&entries, &commits, &contents)?)
    }

    fn append_record(&self, notes_ref: &str, revision: &str, record: &Record) -> Result<()> {
        validate_notes_ref(notes_ref)?;
        validate_anchor(revision)?;
        if record.as_bytes().contains(&b'\n') {
            bail!("a note record must be a single line");
        }
        self.run_git_with_stdin(
            &["notes", "--ref", notes_ref, "append", "-F", "-", revision],
            record.as_bytes().to_vec(),
        )
        .with_context(|| format!("Failed to append note to {revision} under {notes_ref}"))?;
        Ok(())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        validate_anchor(ancestor)?;
        validate_anchor(descendant)?;
        let output =
            self.run_git_output(&["merge-base", "--is-ancestor", ancestor, descendant])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => {
                // Unknown refs are reported as errors by git; treat them as "not an ancestor".
                tracing::debug!(
                    ancestor,
                    descendant,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "ancestry check failed"
                );
                Ok(false)
            }
        }
    }

    fn current_working_ref(&self) -> Result<String> {
        if let Some(head) = self.maybe_symbolic_ref_head() {
            return Ok(head);
        }

        let commit = self.current_commit()?;
        Ok(format!("detached:{commit}"))
    }

    fn commits_between(&self, from: &str, to: &str) -> Result<Vec<String>> {
        validate_anchor(from)?;
        validate_anchor(to)?;
        let range = format!("{from}..{to}");
        let output = self
            .run_git(&["rev-list", "--reverse", &range])
            .with_context(|| format!("Failed to list commits in {range}"))?;

        Ok(output
            .lines()
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        validate_anchor(a)?;
        validate_anchor(b)?;
        let args = ["merge-base", a, b];
        let output = self.run_git_output(&args)?;
        // Exit status 1 with no output means the histories are unrelated.
        if output.status.code() == Some(1) && output.stdout.is_empty() {
            return Ok(None);
        }
        check_status(&args, &output)?;
        let base = String::from_utf8(output.stdout)
            .context("git merge-base output was not valid UTF-8")?
            .trim()
            .to_string();
        Ok((!base.is_empty()).then_some(base))
    }
}
