//! Article text normalization.
//!
//! Raw article text is collapsed to single-spaced prose and bounded to a
//! character budget before it is interpolated into model prompts. Cuts prefer
//! a sentence boundary near the end of the budget; otherwise the text is cut
//! hard and marked with [`CONTINUATION_MARKER`].
//!
//! All lengths are counted in `char`s, never bytes.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Appended when the cut falls mid-sentence.
pub const CONTINUATION_MARKER: &str = "...";

/// Character that ends a sentence for truncation purposes.
const SENTENCE_TERMINAL: char = '.';

/// A terminal at or past this fraction of the limit (4/5) is a clean cut point.
const SENTENCE_CUT_NUMERATOR: usize = 4;
const SENTENCE_CUT_DENOMINATOR: usize = 5;

/// Collapse whitespace and bound `raw` to `limit` characters.
///
/// - Empty (or all-whitespace) input yields an empty string.
/// - Text within the limit is returned with whitespace collapsed only.
/// - Otherwise the first `limit` characters are kept; if their last `.` sits at
///   or beyond 80% of `limit` the result ends on that `.`, else the full
///   `limit` characters are kept and `...` is appended.
pub fn normalize(raw: &str, limit: usize) -> String {
    let collapsed = collapse_whitespace(raw);
    if collapsed.is_empty() {
        return collapsed;
    }

    let char_len = collapsed.chars().count();
    if char_len <= limit {
        return collapsed;
    }

    let head = take_chars(&collapsed, limit);

    if let Some(byte_idx) = head.rfind(SENTENCE_TERMINAL) {
        let char_idx = head[..byte_idx].chars().count();
        if char_idx * SENTENCE_CUT_DENOMINATOR >= limit * SENTENCE_CUT_NUMERATOR {
            debug!(char_len, limit, cut_at = char_idx + 1, "truncated at sentence boundary");
            return head[..byte_idx + SENTENCE_TERMINAL.len_utf8()].to_string();
        }
    }

    debug!(char_len, limit, "truncated mid-sentence");
    format!("{head}{CONTINUATION_MARKER}")
}

/// Replace every whitespace run (newlines included) with one space and trim the ends.
pub fn collapse_whitespace(raw: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(raw.trim(), " ").into_owned()
}

/// The first `n` characters of `s`.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
