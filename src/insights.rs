//! Insight extraction: summary, key points, sentiment, category, and
//! locally detected tables from a document's full text.
//!
//! All generative artifacts go through a single [`Generator`]; any backend
//! failure (timeout, malformed response, auth/quota) propagates as a hard
//! failure of the whole extraction — nothing is silently defaulted.

use anyhow::Result;
use std::sync::Arc;

use crate::llm::Generator;
use crate::models::{Insights, Table};

/// Input truncation for summary and key points, bounding backend cost.
/// Trailing content beyond this is not analyzed.
const SUMMARY_INPUT_CHARS: usize = 6000;
/// Shorter truncation for the single-label classifications.
const CLASSIFY_INPUT_CHARS: usize = 4000;

/// Default number of key points requested.
pub const DEFAULT_KEY_POINTS: usize = 5;
/// Number of key points carried over into the keyword list.
const KEYWORD_COUNT: usize = 8;

/// Derives summary, key points, sentiment, category, and tables from
/// extracted text.
pub struct InsightExtractor {
    generator: Arc<dyn Generator>,
    max_key_points: usize,
}

impl InsightExtractor {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            max_key_points: DEFAULT_KEY_POINTS,
        }
    }

    /// Produce the full insights bundle for a document's text.
    pub async fn extract(&self, text: &str) -> Result<Insights> {
        let summary = self.summarize(text).await?;
        let key_points = self.key_points(text).await?;
        let sentiment = self.sentiment(text).await?;
        let category = self.category(text).await?;
        let tables = extract_tables(text);
        let keywords = key_points.iter().take(KEYWORD_COUNT).cloned().collect();

        Ok(Insights {
            summary,
            key_points,
            sentiment,
            category,
            keywords,
            tables,
        })
    }

    /// 4-6 sentence abstractive summary of the truncated text.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        let prompt = "Summarize the following document in 4-6 concise sentences. \
                      Focus on the core themes and key facts.";
        self.generator
            .complete(prompt, truncate_chars(text, SUMMARY_INPUT_CHARS), 350)
            .await
    }

    /// Short ordered list of salient statements, bullet markup stripped.
    pub async fn key_points(&self, text: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "List the {} most important bullet points from the document. \
             Return them as a plain list separated by newline characters.",
            self.max_key_points
        );
        let output = self
            .generator
            .complete(&prompt, truncate_chars(text, SUMMARY_INPUT_CHARS), 300)
            .await?;

        Ok(parse_key_points(&output, self.max_key_points))
    }

    /// Single-word sentiment classification, lowercased.
    pub async fn sentiment(&self, text: &str) -> Result<String> {
        let prompt = "Classify the overall sentiment of this document as Positive, Neutral, \
                      or Negative. Respond with a single word.";
        let sentiment = self
            .generator
            .complete(prompt, truncate_chars(text, CLASSIFY_INPUT_CHARS), 5)
            .await?;
        Ok(sentiment.trim().to_lowercase())
    }

    /// Single high-level category label.
    pub async fn category(&self, text: &str) -> Result<String> {
        let prompt = "Classify this document into a high-level category \
                      (e.g., Finance, Legal, Marketing, Technical, HR, Medical, Other). \
                      Respond with just the category.";
        let category = self
            .generator
            .complete(prompt, truncate_chars(text, CLASSIFY_INPUT_CHARS), 10)
            .await?;
        Ok(category.trim().to_string())
    }
}

/// Truncate to at most `max` characters without splitting a code point.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Parse a newline-separated list: strip bullet markup and surrounding
/// whitespace, drop empty lines, cap at `max_points` even if the generator
/// returned more.
fn parse_key_points(output: &str, max_points: usize) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '•', '*']).trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .take(max_points)
        .collect()
}

/// Detect tables: contiguous runs of lines containing a `|` delimiter.
/// The first line of a run is treated as headers, the rest as rows; runs
/// shorter than 2 lines are discarded.
pub fn extract_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        if line.contains('|') {
            let row: Vec<String> = line
                .split('|')
                .map(|cell| cell.trim().to_string())
                .filter(|cell| !cell.is_empty())
                .collect();
            if !row.is_empty() {
                current.push(row);
            }
        } else if !current.is_empty() {
            if current.len() >= 2 {
                tables.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if current.len() >= 2 {
        tables.push(current);
    }

    tables
        .into_iter()
        .map(|mut raw| {
            let headers = raw.remove(0);
            Table { headers, rows: raw }
        })
        .collect()
}
