//! Parsers for the bulk notes retrieval protocol.
//!
//! Reading every note under a ref costs three git invocations no matter how
//! many commits are annotated:
//!
//! 1. `git notes --ref <ref> list` gives `<note blob> <annotated object>` pairs.
//! 2. `git cat-file --batch-check='%(objectname) %(objecttype)'` tells which
//!    annotated objects are commits.
//! 3. `git cat-file --batch='%(objectname)\n%(objectsize)'` returns every note
//!    blob, length-prefixed.
//!
//! The functions here only parse those outputs, so they work on plain byte
//! buffers and never touch a repository.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::{Record, RecordsByRevision};

/// Format passed to `git cat-file --batch-check`.
pub const BATCH_CHECK_FORMAT: &str = "--batch-check=%(objectname) %(objecttype)";

/// Format passed to `git cat-file --batch`.
pub const BATCH_CONTENTS_FORMAT: &str = "--batch=%(objectname)\n%(objectsize)";

/// Output that does not follow the expected batch grammar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed line from 'git notes list': {line:?}")]
    MalformedListLine { line: String },

    #[error("malformed line from batch type check: {line:?}")]
    MalformedCheckLine { line: String },

    #[error("batch read reported a missing object: {object:?}")]
    MissingObject { object: String },

    #[error("batch read ended before the size of {object:?}")]
    MissingSize { object: String },

    #[error("invalid object size {size:?} for {object:?}")]
    InvalidSize { object: String, size: String },

    #[error("content of {object:?} truncated: declared {declared} bytes, {available} available")]
    Truncated {
        object: String,
        declared: usize,
        available: usize,
    },

    #[error("no content returned for note blob {blob:?}")]
    MissingContent { blob: String },
}

/// One line of `git notes list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    /// Blob holding the note text.
    pub blob: String,
    /// Object the note is attached to.
    pub object: String,
}

/// Parse `git notes list` output.
pub fn parse_notes_list(output: &[u8]) -> Result<Vec<NoteEntry>, ProtocolError> {
    let text = String::from_utf8_lossy(output);
    let mut entries = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split(' ');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(blob), Some(object), None) if !blob.is_empty() && !object.is_empty() => {
                entries.push(NoteEntry {
                    blob: blob.to_string(),
                    object: object.to_string(),
                });
            }
            _ => {
                return Err(ProtocolError::MalformedListLine {
                    line: line.to_string(),
                })
            }
        }
    }
    Ok(entries)
}

/// Parse batch-check output and return the ids whose type is `commit`.
pub fn parse_batch_check(output: &[u8]) -> Result<HashSet<String>, ProtocolError> {
    let text = String::from_utf8_lossy(output);
    let mut commits = HashSet::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let Some((name, kind)) = line.split_once(' ') else {
            return Err(ProtocolError::MalformedCheckLine {
                line: line.to_string(),
            });
        };
        if name.is_empty() || kind.is_empty() {
            return Err(ProtocolError::MalformedCheckLine {
                line: line.to_string(),
            });
        }
        if kind == "commit" {
            commits.insert(name.to_string());
        }
    }
    Ok(commits)
}

/// Parse batch contents output into a map from object id to raw bytes.
///
/// Each entry is `<id>\n<size>\n<size bytes>` followed by newlines. The
/// content may itself contain newlines, so it is read by length and never by
/// scanning for a terminator.
pub fn parse_batch_contents(output: &[u8]) -> Result<HashMap<String, Vec<u8>>, ProtocolError> {
    let mut contents = HashMap::new();
    let mut pos = 0;
    loop {
        while output.get(pos) == Some(&b'\n') {
            pos += 1;
        }
        if pos >= output.len() {
            break;
        }
        let Some((name, next)) = read_line(output, pos) else {
            if output[pos..].trim_ascii().is_empty() {
                break;
            }
            return Err(ProtocolError::MissingSize {
                object: String::from_utf8_lossy(&output[pos..]).into_owned(),
            });
        };
        if let Some(object) = name.strip_suffix(" missing") {
            return Err(ProtocolError::MissingObject {
                object: object.to_string(),
            });
        }
        let Some((size_field, next)) = read_line(output, next) else {
            return Err(ProtocolError::MissingSize { object: name });
        };
        let size: usize = size_field
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidSize {
                object: name.clone(),
                size: size_field.clone(),
            })?;
        let available = output.len() - next;
        if size > available {
            return Err(ProtocolError::Truncated {
                object: name,
                declared: size,
                available,
            });
        }
        contents.insert(name, output[next..next + size].to_vec());
        pos = next + size;
    }
    Ok(contents)
}

/// Read up to the next newline starting at `start`; returns the line and the
/// offset just past the newline.
fn read_line(buf: &[u8], start: usize) -> Option<(String, usize)> {
    let len = buf[start..].iter().position(|&b| b == b'\n')?;
    let line = String::from_utf8_lossy(&buf[start..start + len]).into_owned();
    Some((line, start + len + 1))
}

/// Stdin for a batch call: one id per line.
#[must_use]
pub fn batch_input<'a, I>(ids: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut input = Vec::new();
    for id in ids {
        input.extend_from_slice(id.as_bytes());
        input.push(b'\n');
    }
    input
}

/// Combine the three responses into records per annotated commit.
///
/// Entries attached to non-commit objects are dropped.
pub fn zip_records(
    entries: &[NoteEntry],
    commits: &HashSet<String>,
    contents: &HashMap<String, Vec<u8>>,
) -> Result<RecordsByRevision, ProtocolError> {
    let mut out = RecordsByRevision::new();
    for entry in entries {
        if !commits.contains(&entry.object) {
            continue;
        }
        let content = contents
            .get(&entry.blob)
            .ok_or_else(|| ProtocolError::MissingContent {
                blob: entry.blob.clone(),
            })?;
        out.insert(entry.object.clone(), Record::split_lines(content));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notes_list() {
        let out = b"b1 c1\nb2 c2\n";
        let entries = parse_notes_list(out).unwrap();
        assert_eq!(
            entries,
            vec![
                NoteEntry {
                    blob: "b1".to_string(),
                    object: "c1".to_string()
                },
                NoteEntry {
                    blob: "b2".to_string(),
                    object: "c2".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_notes_list_empty() {
        assert!(parse_notes_list(b"").unwrap().is_empty());
    }

    #[test]
    fn test_parse_notes_list_malformed() {
        let err = parse_notes_list(b"b1 c1\nonlyone\n").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MalformedListLine {
                line: "onlyone".to_string()
            }
        );
        assert!(parse_notes_list(b"a b c\n").is_err());
    }

    #[test]
    fn test_parse_batch_check_keeps_commits_only() {
        let out = b"c1 commit\nt1 tree\nb1 blob\nc2 commit\nx9 missing\n";
        let commits = parse_batch_check(out).unwrap();
        assert_eq!(commits.len(), 2);
        assert!(commits.contains("c1"));
        assert!(commits.contains("c2"));
        assert!(!commits.contains("x9"));
    }

    #[test]
    fn test_parse_batch_check_malformed() {
        assert!(matches!(
            parse_batch_check(b"nospace\n"),
            Err(ProtocolError::MalformedCheckLine { .. })
        ));
    }

    #[test]
    fn test_parse_batch_contents_with_embedded_newlines() {
        let out = b"b1\n9\nline1\nl2\n\nb2\n3\nabc\n";
        let contents = parse_batch_contents(out).unwrap();
        assert_eq!(contents["b1"], b"line1\nl2\n");
        assert_eq!(contents["b2"], b"abc");
    }

    #[test]
    fn test_parse_batch_contents_zero_length() {
        let out = b"b1\n0\n\nb2\n1\nx\n";
        let contents = parse_batch_contents(out).unwrap();
        assert!(contents["b1"].is_empty());
        assert_eq!(contents["b2"], b"x");
    }

    #[test]
    fn test_parse_batch_contents_truncated() {
        let err = parse_batch_contents(b"b1\n50\nshort\n").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Truncated {
                object: "b1".to_string(),
                declared: 50,
                available: 6
            }
        );
    }

    #[test]
    fn test_parse_batch_contents_bad_size() {
        let err = parse_batch_contents(b"b1\ntwelve\nabc\n").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidSize { .. }));
        assert!(err.to_string().contains("twelve"));
    }

    #[test]
    fn test_parse_batch_contents_missing_size() {
        assert!(matches!(
            parse_batch_contents(b"b1\n"),
            Err(ProtocolError::MissingSize { .. })
        ));
        assert!(matches!(
            parse_batch_contents(b"b1"),
            Err(ProtocolError::MissingSize { .. })
        ));
    }

    #[test]
    fn test_parse_batch_contents_missing_object() {
        assert_eq!(
            parse_batch_contents(b"deadbeef missing\n").unwrap_err(),
            ProtocolError::MissingObject {
                object: "deadbeef".to_string()
            }
        );
    }

    #[test]
    fn test_parse_batch_contents_empty() {
        assert!(parse_batch_contents(b"").unwrap().is_empty());
        assert!(parse_batch_contents(b"\n").unwrap().is_empty());
        assert!(parse_batch_contents(b"\n\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_batch_contents_leading_blank_lines() {
        let contents = parse_batch_contents(b"\n\nb1\n3\nabc\n").unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents["b1"], b"abc");
    }

    #[test]
    fn test_zip_records_filters_non_commits() {
        let entries = parse_notes_list(b"b1 c1\nb2 t1\nb3 c2\n").unwrap();
        let commits = parse_batch_check(b"c1 commit\nt1 tree\nc2 commit\n").unwrap();
        let contents = parse_batch_contents(b"b1\n3\none\nb2\n4\ntree\nb3\n7\ntwo\nthr\n").unwrap();

        let zipped = zip_records(&entries, &commits, &contents).unwrap();
        assert_eq!(zipped.len(), 2);
        assert!(!zipped.contains_key("t1"));
        assert_eq!(zipped["c1"], vec![Record::from("one")]);
        assert_eq!(
            zipped["c2"],
            vec![Record::from("two"), Record::from("thr")]
        );
    }

    #[test]
    fn test_zip_records_missing_content() {
        let entries = parse_notes_list(b"b1 c1\n").unwrap();
        let commits = parse_batch_check(b"c1 commit\n").unwrap();
        let err = zip_records(&entries, &commits, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingContent { .. }));
    }

    #[test]
    fn test_batch_input() {
        assert_eq!(batch_input(["a", "b"]), b"a\nb\n".to_vec());
    }
}
