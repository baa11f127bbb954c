// WHY: presentation helpers for matched quotes; each source line is treated as a "page"

use crate::matcher::QuoteSpan;
use crate::tokenizer::char_slice;

/// Sort spans into reading order: by start line, then start column
pub fn sort_for_display(quotes: &mut [QuoteSpan]) {
    quotes.sort_by_key(|q| (q.start_line_index, q.start_char_index));
}

/// One-based page label, `"3"` or `"3 - 4"` for quotes crossing pages
pub fn page_label(quote: &QuoteSpan) -> String {
    if quote.is_multiline() {
        format!("{} - {}", quote.start_line_index + 1, quote.end_line_index + 1)
    } else {
        format!("{}", quote.start_line_index + 1)
    }
}

/// Original source text covered by a quote
///
/// Lines inside a multi-line quote are joined with `\n`. Out-of-range lines yield
/// an empty contribution rather than panicking.
pub fn extract_quote<S: AsRef<str>>(lines: &[S], quote: &QuoteSpan) -> String {
    let line = |index: usize| lines.get(index).map(|l| l.as_ref()).unwrap_or("");

    if !quote.is_multiline() {
        return char_slice(line(quote.start_line_index), quote.start_char_index, quote.end_char_index)
            .to_string();
    }

    let first = line(quote.start_line_index);
    let mut text = char_slice(first, quote.start_char_index, usize::MAX).to_string();
    for index in quote.start_line_index + 1..quote.end_line_index {
        text.push('\n');
        text.push_str(line(index));
    }
    text.push('\n');
    text.push_str(char_slice(line(quote.end_line_index), 0, quote.end_char_index));
    text
}

/// Format a quote as `page<TAB>text` with interior line breaks collapsed to spaces
pub fn format_quote_line<S: AsRef<str>>(lines: &[S], quote: &QuoteSpan) -> String {
    let text = extract_quote(lines, quote);
    let single_line: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    format!("{}\t{}", page_label(quote), single_line.join(" "))
}
