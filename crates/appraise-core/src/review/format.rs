//! Plain-text rendering of reviews and comment threads.

use chrono::DateTime;

use super::thread::CommentThread;
use super::Review;

/// `[status] revision` followed by the quoted description on its own line.
#[must_use]
pub fn summary(review: &Review) -> String {
    format!(
        "[{}] {}\n  \"{}\"\n",
        review.status(),
        review.revision,
        review.request.description
    )
}

/// Summary plus every thread, replies indented under their parent.
#[must_use]
pub fn details(review: &Review) -> String {
    let mut out = summary(review);
    for thread in &review.comments {
        render_thread(&mut out, thread, 1);
    }
    out
}

/// Render `thread` and its replies starting at `depth` (two spaces per level).
pub fn render_thread(out: &mut String, thread: &CommentThread, depth: usize) {
    for (below, node) in thread.walk() {
        let comment = &node.comment;
        out.push_str(&format!(
            "{:indent$}[{}] {} {} \"{}\"\n",
            "",
            reformat_timestamp(&comment.timestamp),
            comment.author,
            comment.resolved.comment_status(),
            comment.description,
            indent = (depth + below) * 2,
        ));
    }
}

/// Turn epoch seconds into `Mon Jan  2 15:04:05 UTC 2006`.
///
/// Anything that is not an integer in range is returned unchanged.
#[must_use]
pub fn reformat_timestamp(timestamp: &str) -> String {
    timestamp
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map_or_else(
            || timestamp.to_string(),
            |t| t.format("%a %b %e %H:%M:%S UTC %Y").to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{Comment, Request, Resolution};

    fn comment(hash: &str, ts: &str, resolved: Resolution, text: &str) -> Comment {
        Comment {
            hash: hash.to_string(),
            timestamp: ts.to_string(),
            author: "bob@example.com".to_string(),
            location: None,
            parent: String::new(),
            description: text.to_string(),
            resolved,
            v: 0,
        }
    }

    fn review(resolved: Resolution, comments: Vec<CommentThread>) -> Review {
        Review {
            revision: "0123abcd".to_string(),
            request: Request {
                timestamp: "0".to_string(),
                review_ref: "refs/heads/feature".to_string(),
                target_ref: "refs/heads/master".to_string(),
                requester: "alice@example.com".to_string(),
                reviewers: vec![],
                description: "Speed up listing".to_string(),
                base_commit: None,
                v: 0,
            },
            comments,
            resolved,
            submitted: false,
        }
    }

    #[test]
    fn test_reformat_timestamp() {
        assert_eq!(reformat_timestamp("0"), "Thu Jan  1 00:00:00 UTC 1970");
        assert_eq!(
            reformat_timestamp("1136214245"),
            "Mon Jan  2 15:04:05 UTC 2006"
        );
        assert_eq!(reformat_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_summary_status_words() {
        assert_eq!(
            summary(&review(Resolution::Unset, vec![])),
            "[pending] 0123abcd\n  \"Speed up listing\"\n"
        );
        assert!(summary(&review(Resolution::Accepted, vec![])).starts_with("[accepted]"));
        assert!(summary(&review(Resolution::NeedsWork, vec![])).starts_with("[rejected]"));
    }

    #[test]
    fn test_details_of_deep_chain() {
        const DEPTH: usize = 5_000;
        let records: Vec<crate::scm::Record> = {
            let mut parent = String::new();
            (0..DEPTH)
                .map(|i| {
                    let link = if parent.is_empty() {
                        String::new()
                    } else {
                        format!(r#","parent":"{parent}""#)
                    };
                    let text = format!(
                        r#"{{"timestamp":"{i}","author":"a","description":"r{i}"{link}}}"#
                    );
                    parent = crate::review::comment::record_hash(text.as_bytes());
                    crate::scm::Record::from(text.as_str())
                })
                .collect()
        };
        let request = review(Resolution::Unset, vec![]).request;
        let review = Review::assemble("0123abcd".to_string(), request, &records, false);
        assert_eq!(review.comments.len(), 1);
        assert_eq!(review.comments[0].comment_count(), DEPTH);

        let text = details(&review);
        assert_eq!(text.lines().count(), DEPTH + 2);
        let last = text.lines().last().unwrap();
        assert!(last.starts_with(&" ".repeat(DEPTH * 2)));
        assert!(last.ends_with(&format!("\"r{}\"", DEPTH - 1)));
    }

    #[test]
    fn test_details_indents_replies() {
        let mut root = CommentThread::new(comment("a", "0", Resolution::NeedsWork, "fix this"));
        root.children
            .push(CommentThread::new(comment("b", "60", Resolution::Unset, "done")));
        let text = details(&review(Resolution::NeedsWork, vec![root]));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[2],
            "  [Thu Jan  1 00:00:00 UTC 1970] bob@example.com needs work \"fix this\""
        );
        assert_eq!(
            lines[3],
            "    [Thu Jan  1 00:01:00 UTC 1970] bob@example.com fyi \"done\""
        );
    }
}
