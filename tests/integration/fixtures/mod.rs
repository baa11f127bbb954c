// Test fixtures with known source/query pairs and expected quote output
// WHY: Golden-file testing requires deterministic input/output pairs for validation

/// Source corpus, one page per line
pub const CORPUS_TEXT: &str = "It was a bright cold day in April, and the clocks were striking thirteen.
Winston Smith, his chin nuzzled into his breast in an effort to escape the vile wind,
slipped quickly through the glass doors of Victory Mansions.
Caf\u{e9} society\u{2014}never the same again.";

/// Query quoting two passages of CORPUS_TEXT, one of them across a page break
pub const QUERY_TEXT: &str = "Someone wrote: it was a bright cold day in april. Later, the vile wind \
slipped quickly through the glass doors of the building.";

/// Expected quotes for CORPUS_TEXT / QUERY_TEXT
/// Format: page<TAB>quote, sorted by start position
/// WHY: the third row starts on a later page at an earlier column, so the bounding-box
/// duplicate test does not treat it as covered by the second row
pub const CORPUS_EXPECTED: &str = "1\tIt was a bright cold day in April,
2 - 3\tthe vile wind, slipped quickly through the glass doors of
3\tslipped quickly through the glass doors of";

/// Query sharing only four consecutive words with CORPUS_TEXT
pub const NEAR_MISS_QUERY: &str = "a bright cold day for a walk";

/// Query that differs only by case, punctuation and accents from the last corpus page
pub const ACCENT_QUERY: &str = "CAFE SOCIETY never, the same again";

pub const ACCENT_EXPECTED: &str = "4\tCaf\u{e9} society\u{2014}never the same again.";
