// WHY: standalone word normalization so tokenizer and tests share one definition of "same word"
// Normalized form: NFKD decomposition, non-word characters removed, lowercased

use unicode_normalization::UnicodeNormalization;

/// Characters that end a word in progress and never become part of a word
pub const BREAK_CHARS: [char; 5] = [' ', '\u{2014}', '\t', '\r', '\n'];

/// Check whether a character terminates the current word
pub fn is_break_char(ch: char) -> bool {
    BREAK_CHARS.contains(&ch)
}

/// Word characters survive normalization: ASCII letters, digits and underscore
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Normalize a raw word run, allocating a new string
pub fn normalize_word(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    normalize_word_into(raw, &mut result);
    result
}

/// Normalize a raw word run into the supplied buffer
/// WHY: the tokenizer normalizes once per run, so the buffer is reused across a whole text
pub fn normalize_word_into(raw: &str, buffer: &mut String) {
    buffer.clear();

    // Compatibility decomposition splits accented letters into base + combining mark,
    // and the combining mark is then dropped with the other non-word characters
    for ch in raw.nfkd() {
        if is_word_char(ch) {
            buffer.push(ch.to_ascii_lowercase());
        }
    }
}
