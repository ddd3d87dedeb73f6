//! Output formatting module for appraise
//!
//! Reviews render as the summary/detail text from `appraise-core` or as JSON.
//! Other command results render through [`TextOutput`] or as JSON.

use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};

use appraise_core::review::{Comment, Request, Resolution, Review, ReviewStatus};

/// Human-readable rendering of a command result.
pub trait TextOutput {
    fn to_text(&self) -> String;
}

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format - machine-readable output
    Json,
    /// Plain text format
    #[default]
    Text,
}

/// Formatter that can output data in text or JSON format
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Create a new formatter with the specified output format
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format data according to the configured output format
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format<T: Serialize + TextOutput>(&self, data: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
            OutputFormat::Text => Ok(data.to_text()),
        }
    }

    /// Format and print data to stdout
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print<T: Serialize + TextOutput>(&self, data: &T) -> Result<()> {
        let output = self.format(data)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{output}")?;
        Ok(())
    }

    /// Render one review: details (or just the summary) as text, the full review as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format_review(&self, review: &Review, with_details: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&ReviewOutput::from(review))?),
            OutputFormat::Text if with_details => Ok(review.details()),
            OutputFormat::Text => Ok(review.summary()),
        }
    }

    /// Print one review, see [`format_review`](Self::format_review).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_review(&self, review: &Review, with_details: bool) -> Result<()> {
        let output = self.format_review(review, with_details)?;
        let mut stdout = io::stdout().lock();
        write!(stdout, "{output}")?;
        if self.format == OutputFormat::Json {
            writeln!(stdout)?;
        }
        Ok(())
    }

    /// Render a list of reviews.
    ///
    /// For JSON, wraps the array in an object with count and advice fields.
    /// For text, prints one summary per review, or `empty_message`.
    pub fn format_reviews(
        &self,
        reviews: &[Review],
        empty_message: &str,
        advice: &[&str],
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let items: Vec<ReviewOutput<'_>> = reviews.iter().map(ReviewOutput::from).collect();
                let mut envelope = serde_json::Map::new();
                envelope.insert("reviews".to_string(), serde_json::to_value(items)?);
                envelope.insert("count".to_string(), serde_json::json!(reviews.len()));
                envelope.insert("advice".to_string(), serde_json::json!(advice));
                Ok(serde_json::to_string_pretty(&serde_json::Value::Object(
                    envelope,
                ))? + "\n")
            }
            OutputFormat::Text if reviews.is_empty() => Ok(format!("{empty_message}\n")),
            OutputFormat::Text => Ok(reviews.iter().map(Review::summary).collect()),
        }
    }

    /// Print a list of reviews, see [`format_reviews`](Self::format_reviews).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_reviews(
        &self,
        reviews: &[Review],
        empty_message: &str,
        advice: &[&str],
    ) -> Result<()> {
        let output = self.format_reviews(reviews, empty_message, advice)?;
        let mut stdout = io::stdout().lock();
        write!(stdout, "{output}")?;
        Ok(())
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

/// JSON shape of a review.
#[derive(Debug, Serialize)]
pub struct ReviewOutput<'a> {
    pub revision: &'a str,
    pub status: ReviewStatus,
    pub submitted: bool,
    pub resolved: Resolution,
    pub request: &'a Request,
    /// Every comment of every thread, in pre-order.
    pub comments: Vec<CommentEntry<'a>>,
}

impl<'a> From<&'a Review> for ReviewOutput<'a> {
    fn from(review: &'a Review) -> Self {
        let comments = review
            .comments
            .iter()
            .flat_map(|thread| thread.walk())
            .map(|(depth, thread)| CommentEntry {
                hash: &thread.comment.hash,
                depth,
                comment: &thread.comment,
                resolved: thread.resolved,
            })
            .collect();
        Self {
            revision: &review.revision,
            status: review.status(),
            submitted: review.submitted,
            resolved: review.resolved,
            request: &review.request,
            comments,
        }
    }
}

/// JSON shape of one comment in a review. Unlike the stored record, carries
/// the hash; `depth` is 0 for a thread root.
#[derive(Debug, Serialize)]
pub struct CommentEntry<'a> {
    pub hash: &'a str,
    pub depth: usize,
    pub comment: &'a Comment,
    /// Aggregate over the comment and its replies.
    pub resolved: Resolution,
}

/// Abbreviated object id for text output.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// Quote `text` on one line.
#[must_use]
pub fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\n', "\\n"))
}
