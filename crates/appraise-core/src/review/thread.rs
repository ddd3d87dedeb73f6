//! Comment threads: reconstruction from a flat comment log and
//! bottom-up resolution aggregation.
//!
//! Reply chains come from other people's notes and can be arbitrarily deep,
//! so every walk over a thread uses an explicit stack.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::comment::Comment;
use super::resolution::Resolution;

/// A comment together with its replies.
///
/// `resolved` is the aggregate over the whole subtree, which may differ from
/// `comment.resolved`. It is only meaningful after [`resolve_threads`] ran.
pub struct CommentThread {
    pub comment: Comment,
    pub children: Vec<CommentThread>,
    pub resolved: Resolution,
}

impl CommentThread {
    #[must_use]
    pub const fn new(comment: Comment) -> Self {
        Self {
            comment,
            children: Vec::new(),
            resolved: Resolution::Unset,
        }
    }

    /// Recompute `resolved` for this thread and every descendant.
    ///
    /// An objection anywhere below poisons the subtree. Accepted replies only
    /// carry up through a comment that is itself accepted; otherwise the
    /// subtree is demoted to informational.
    pub fn update_resolved(&mut self) {
        let children = resolve_forest(std::mem::take(&mut self.children));
        self.resolved = combine(
            self.comment.resolved,
            Resolution::conjunction(children.iter().map(|t| t.resolved)),
        );
        self.children = children;
    }

    /// Total number of comments in this thread, including the root.
    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.walk().count()
    }

    /// Pre-order walk over the thread, yielding each comment with its depth
    /// below this one (the root is depth 0).
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }

    /// This node without its replies.
    fn shell(&self) -> Self {
        Self {
            comment: self.comment.clone(),
            children: Vec::new(),
            resolved: self.resolved,
        }
    }
}

/// Iterator returned by [`CommentThread::walk`].
pub struct Walk<'a> {
    stack: Vec<(usize, &'a CommentThread)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a CommentThread);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, thread) = self.stack.pop()?;
        self.stack
            .extend(thread.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, thread))
    }
}

impl Drop for CommentThread {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut thread) = pending.pop() {
            pending.append(&mut thread.children);
        }
    }
}

impl Clone for CommentThread {
    fn clone(&self) -> Self {
        let mut root = self.shell();
        // Copies of the ancestors of the next node, depth 1 first.
        let mut open: Vec<Self> = Vec::new();
        let close = |open: &mut Vec<Self>, root: &mut Self| {
            if let Some(done) = open.pop() {
                match open.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => root.children.push(done),
                }
            }
        };
        for (depth, thread) in self.walk().skip(1) {
            while open.len() >= depth {
                close(&mut open, &mut root);
            }
            open.push(thread.shell());
        }
        while !open.is_empty() {
            close(&mut open, &mut root);
        }
        root
    }
}

impl PartialEq for CommentThread {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.walk();
        let mut right = other.walk();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some((da, a)), Some((db, b)))
                    if da == db && a.resolved == b.resolved && a.comment == b.comment => {}
                _ => return false,
            }
        }
    }
}

impl Eq for CommentThread {}

impl fmt::Debug for CommentThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentThread")
            .field("comment", &self.comment)
            .field("resolved", &self.resolved)
            .field("replies", &(self.comment_count() - 1))
            .finish()
    }
}

/// Serialized as the root comment plus a flat, pre-order list of replies
/// tagged with their depth.
impl Serialize for CommentThread {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CommentThread", 3)?;
        state.serialize_field("comment", &self.comment)?;
        state.serialize_field("resolved", &self.resolved)?;
        state.serialize_field("replies", &Replies(self))?;
        state.end()
    }
}

struct Replies<'a>(&'a CommentThread);

#[derive(Serialize)]
struct Reply<'a> {
    depth: usize,
    comment: &'a Comment,
    resolved: Resolution,
}

impl Serialize for Replies<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.walk().skip(1).map(|(depth, thread)| Reply {
            depth,
            comment: &thread.comment,
            resolved: thread.resolved,
        }))
    }
}

/// Sort `threads` by timestamp, resolve each one, and return their aggregate.
///
/// The sort is stable, so comments sharing a timestamp keep their order.
pub fn resolve_threads(threads: &mut Vec<CommentThread>) -> Resolution {
    *threads = resolve_forest(std::mem::take(threads));
    Resolution::conjunction(threads.iter().map(|t| t.resolved))
}

/// A thread's aggregate from its own verdict and that of its replies.
fn combine(own: Resolution, replies: Resolution) -> Resolution {
    match replies {
        Resolution::Unset => own,
        Resolution::NeedsWork => Resolution::NeedsWork,
        Resolution::Accepted => match own {
            Resolution::Accepted => Resolution::Accepted,
            Resolution::Unset | Resolution::NeedsWork => Resolution::Unset,
        },
    }
}

/// One level of the resolution walk: a node whose replies are being resolved.
struct Frame {
    /// `None` for the top level of the forest.
    thread: Option<CommentThread>,
    pending: std::vec::IntoIter<CommentThread>,
    done: Vec<CommentThread>,
}

impl Frame {
    fn new(thread: Option<CommentThread>, mut children: Vec<CommentThread>) -> Self {
        sort_by_timestamp(&mut children);
        Self {
            thread,
            done: Vec::with_capacity(children.len()),
            pending: children.into_iter(),
        }
    }
}

/// Sort and resolve every level of `forest`, children before parents.
fn resolve_forest(forest: Vec<CommentThread>) -> Vec<CommentThread> {
    let mut stack = vec![Frame::new(None, forest)];
    while let Some(mut frame) = stack.pop() {
        if let Some(mut child) = frame.pending.next() {
            let grandchildren = std::mem::take(&mut child.children);
            stack.push(frame);
            stack.push(Frame::new(Some(child), grandchildren));
            continue;
        }
        let Some(mut thread) = frame.thread else {
            return frame.done;
        };
        thread.resolved = combine(
            thread.comment.resolved,
            Resolution::conjunction(frame.done.iter().map(|t| t.resolved)),
        );
        thread.children = frame.done;
        if let Some(parent) = stack.last_mut() {
            parent.done.push(thread);
        }
    }
    Vec::new()
}

fn sort_by_timestamp(threads: &mut [CommentThread]) {
    threads.sort_by(|a, b| compare_timestamps(&a.comment.timestamp, &b.comment.timestamp));
}

/// Order epoch-second timestamps numerically, falling back to text order.
fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Build the comment forest from a flat list of comments.
///
/// Comments are keyed by hash; a later duplicate replaces the earlier one.
/// A comment whose parent is not present (or that only reaches a root through
/// a cycle) is dropped. Children are attached through an index arena and the
/// owned tree is assembled bottom-up from a post-order of the arena.
#[must_use]
pub fn build_threads<I>(comments: I) -> Vec<CommentThread>
where
    I: IntoIterator<Item = Comment>,
{
    let mut slots: Vec<Option<Comment>> = Vec::new();
    let mut by_hash: HashMap<String, usize> = HashMap::new();
    for comment in comments {
        match by_hash.get(&comment.hash) {
            Some(&idx) => slots[idx] = Some(comment),
            None => {
                by_hash.insert(comment.hash.clone(), slots.len());
                slots.push(Some(comment));
            }
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    let mut roots = Vec::new();
    for (idx, slot) in slots.iter().enumerate() {
        let Some(comment) = slot else { continue };
        if comment.parent.is_empty() {
            roots.push(idx);
        } else if let Some(&parent) = by_hash.get(&comment.parent) {
            children[parent].push(idx);
        } else {
            tracing::debug!(
                hash = %comment.hash,
                parent = %comment.parent,
                "dropping comment with unknown parent"
            );
        }
    }

    let mut built: Vec<Option<CommentThread>> = Vec::new();
    built.resize_with(slots.len(), || None);
    for idx in post_order(&roots, &children) {
        // Each slot is taken exactly once, which also guards against revisits.
        let Some(comment) = slots[idx].take() else { continue };
        let mut thread = CommentThread::new(comment);
        thread.children = children[idx]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[idx] = Some(thread);
    }
    roots
        .into_iter()
        .filter_map(|idx| built[idx].take())
        .collect()
}

/// Arena indices reachable from `roots`, every child before its parent.
fn post_order(roots: &[usize], children: &[Vec<usize>]) -> Vec<usize> {
    let mut order = Vec::with_capacity(children.len());
    let mut visited = vec![false; children.len()];
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&idx| (idx, false)).collect();
    while let Some((idx, expanded)) = stack.pop() {
        if expanded {
            order.push(idx);
            continue;
        }
        if std::mem::replace(&mut visited[idx], true) {
            continue;
        }
        stack.push((idx, true));
        stack.extend(children[idx].iter().rev().map(|&child| (child, false)));
    }
    order
}
