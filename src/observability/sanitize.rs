//! Log-safe rendering of request parameters.
//!
//! Phone numbers and message bodies arrive percent-encoded and may carry line
//! breaks. Before they reach a log line they are decoded, line breaks become a
//! visible marker, and whitespace runs collapse, so every request stays on a
//! single log line.

use percent_encoding::percent_decode_str;

/// Visible stand-in for a line break.
pub const LINE_BREAK_MARKER: &str = "⏎";

/// Longest message prefix written to the request summary.
pub const MAX_LOGGED_MESSAGE_CHARS: usize = 200;

/// Appended to a truncated message.
pub const ELLIPSIS: &str = "…";

/// Decode and flatten `value` into a single log-safe line.
///
/// `+` decodes to a space, as in form-encoded query strings. Invalid percent
/// sequences are kept verbatim.
///
/// Idempotent only when the output carries no `%XX` escape or `+`: each call
/// decodes one layer, so `%2541` becomes `%41` and then `A`.
pub fn sanitize(value: &str) -> String {
    let plus_decoded = value.replace('+', " ");
    let decoded = percent_decode_str(&plus_decoded).decode_utf8_lossy();

    let marked = decoded
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', &format!(" {LINE_BREAK_MARKER} "));

    marked.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`sanitize`] for an optional value; absent maps to the empty string.
pub fn sanitize_opt(value: Option<&str>) -> String {
    value.map(sanitize).unwrap_or_default()
}

/// Cut `text` to [`MAX_LOGGED_MESSAGE_CHARS`] characters, marking the cut.
pub fn truncate_for_log(text: &str) -> String {
    match text.char_indices().nth(MAX_LOGGED_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

/// `-` stands in for an empty field so log columns stay aligned.
pub fn or_dash(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}
