// WHY: greedy quote search between a source word sequence and a query word sequence
// For each source start position the query is swept once, left to right, never rewinding

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::progress::ProgressTracker;
use crate::tokenizer::Word;

/// Shortest run of consecutive matching words reported as a quote
pub const MIN_RUN_LENGTH: usize = 5;

/// Source-side extent of one matched run
///
/// Start is the first word's start offset, end is the last word's end-exclusive offset,
/// both as `char` offsets into their respective source lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSpan {
    pub start_line_index: usize,
    pub start_char_index: usize,
    pub end_line_index: usize,
    pub end_char_index: usize,
}

impl QuoteSpan {
    /// Span covering the words from `first` to `last`
    pub fn from_words(first: &Word, last: &Word) -> Self {
        Self {
            start_line_index: first.line_index,
            start_char_index: first.start_char_index,
            end_line_index: last.line_index,
            end_char_index: last.end_char_index,
        }
    }

    /// Bounding-box containment: lines and chars are compared independently
    ///
    /// Not the same as sub-run containment: a span starting on a later line but at an
    /// earlier column is not contained, even when its words lie inside this span.
    pub fn contains(&self, other: &QuoteSpan) -> bool {
        self.start_line_index <= other.start_line_index
            && self.start_char_index <= other.start_char_index
            && self.end_line_index >= other.end_line_index
            && self.end_char_index >= other.end_char_index
    }

    /// Whether the span crosses a line boundary
    pub fn is_multiline(&self) -> bool {
        self.start_line_index != self.end_line_index
    }
}

/// Find every run of at least `MIN_RUN_LENGTH` source words that reappears in the query
pub fn find_matches(source_words: &[Word], query_words: &[Word]) -> Vec<QuoteSpan> {
    find_matches_with_progress(source_words, query_words, |_| {})
}

/// Find matching runs, reporting percentage of source start positions scanned
///
/// Returned spans are in discovery order; a span whose bounding box is already covered
/// by a recorded span is never added.
pub fn find_matches_with_progress<F: FnMut(u8)>(
    source_words: &[Word],
    query_words: &[Word],
    mut on_progress: F,
) -> Vec<QuoteSpan> {
    let mut tracker = ProgressTracker::new(source_words.len());
    tracker.start(&mut on_progress);

    let mut quotes: Vec<QuoteSpan> = Vec::new();
    if source_words.is_empty() {
        return quotes;
    }
    if query_words.is_empty() {
        tracker.advance(source_words.len(), &mut on_progress);
        return quotes;
    }

    debug!(
        "Matching {} source words against {} query words",
        source_words.len(),
        query_words.len()
    );

    let last_query_index = query_words.len() - 1;

    for start in 0..source_words.len() {
        let mut run_length = 0;

        for (query_index, query_word) in query_words.iter().enumerate() {
            let extends = source_words
                .get(start + run_length)
                .is_some_and(|source_word| source_word.normalized == query_word.normalized);
            if extends {
                run_length += 1;
            }

            // A mismatch or the end of the query closes the run; the mismatching
            // query word is not retried as the start of a new run
            if !extends || query_index == last_query_index {
                if run_length >= MIN_RUN_LENGTH {
                    let candidate = QuoteSpan::from_words(
                        &source_words[start],
                        &source_words[start + run_length - 1],
                    );
                    record_quote(&mut quotes, candidate);
                }
                run_length = 0;
            }
        }

        tracker.advance(start + 1, &mut on_progress);
    }

    debug!("Found {} quotes", quotes.len());
    quotes
}

fn record_quote(quotes: &mut Vec<QuoteSpan>, candidate: QuoteSpan) {
    if quotes.iter().any(|existing| existing.contains(&candidate)) {
        return;
    }
    quotes.push(candidate);
}
