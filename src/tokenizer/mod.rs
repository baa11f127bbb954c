// WHY: splits text into lines and lines into normalized words that remember where they came from
// Positions always refer to the original line text, never to the normalized form

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::progress::ProgressTracker;

pub mod normalization;

pub use normalization::{is_break_char, normalize_word, normalize_word_into, BREAK_CHARS};

/// One normalized word and its position in the original text
///
/// `start_char_index` and `end_char_index` are zero-based, end-exclusive `char` offsets
/// into line `line_index` of the text that produced the word.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub normalized: String,
    pub line_index: usize,
    pub start_char_index: usize,
    pub end_char_index: usize,
}

impl Word {
    /// Raw substring of `line` this word was produced from
    pub fn raw<'a>(&self, line: &'a str) -> &'a str {
        char_slice(line, self.start_char_index, self.end_char_index)
    }
}

/// Slice `line` by `char` offsets, clamping out-of-range bounds to the line end
pub(crate) fn char_slice(line: &str, start: usize, end: usize) -> &str {
    let byte_at = |char_index: usize| {
        line.char_indices()
            .nth(char_index)
            .map(|(byte, _)| byte)
            .unwrap_or(line.len())
    };
    let start_byte = byte_at(start);
    let end_byte = byte_at(end.max(start));
    &line[start_byte..end_byte]
}

/// Tokenize text into words in reading order
pub fn tokenize(text: &str) -> Vec<Word> {
    tokenize_with_progress(text, |_| {})
}

/// Tokenize text, reporting percentage of lines processed
///
/// Reports 0 before the first line and then every time the floor percentage grows,
/// ending at 100. The empty text counts as a single empty line.
pub fn tokenize_with_progress<F: FnMut(u8)>(text: &str, mut on_progress: F) -> Vec<Word> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut tracker = ProgressTracker::new(lines.len());
    tracker.start(&mut on_progress);

    debug!("Tokenizing {} lines ({} bytes)", lines.len(), text.len());

    let mut words = Vec::new();
    let mut buffer = String::new();

    for (line_index, line) in lines.iter().enumerate() {
        tokenize_line(line, line_index, &mut buffer, &mut words);
        tracker.advance(line_index + 1, &mut on_progress);
    }

    debug!("Tokenized {} words", words.len());
    words
}

/// Append the words of a single line
fn tokenize_line(line: &str, line_index: usize, buffer: &mut String, words: &mut Vec<Word>) {
    let mut run_start: Option<(usize, usize)> = None; // (char index, byte index)
    let mut char_count = 0;

    for (char_index, (byte_index, ch)) in line.char_indices().enumerate() {
        char_count = char_index + 1;
        if is_break_char(ch) {
            if let Some((start_char, start_byte)) = run_start.take() {
                push_word(&line[start_byte..byte_index], line_index, start_char, char_index, buffer, words);
            }
        } else if run_start.is_none() {
            run_start = Some((char_index, byte_index));
        }
    }

    if let Some((start_char, start_byte)) = run_start {
        push_word(&line[start_byte..], line_index, start_char, char_count, buffer, words);
    }
}

fn push_word(
    raw: &str,
    line_index: usize,
    start_char_index: usize,
    end_char_index: usize,
    buffer: &mut String,
    words: &mut Vec<Word>,
) {
    normalize_word_into(raw, buffer);
    // Punctuation-only runs vanish entirely
    if buffer.is_empty() {
        return;
    }
    words.push(Word {
        normalized: buffer.clone(),
        line_index,
        start_char_index,
        end_char_index,
    });
}
