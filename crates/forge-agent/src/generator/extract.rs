//! Code extraction from raw model replies.

use regex::Regex;
use std::sync::LazyLock;

/// First fenced block with a recognised tag; the newline before the closing fence is not captured.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"```(?:tsx|jsx|typescript|javascript|ts|js)\b[^\n]*\n((?s:.*?))\n?```") {
        Ok(regex) => regex,
        Err(err) => panic!("Fenced block regex is invalid: {err}"),
    }
});

/// Finds the first recognised fenced block, returning its inner text and start offset.
fn find_fenced_block(response: &str) -> Option<(&str, usize)> {
    let captures = FENCED_BLOCK.captures(response)?;
    let whole = captures.get(0)?;
    let inner = captures.get(1)?;
    Some((inner.as_str(), whole.start()))
}

/// Code carried by a model reply.
///
/// Returns the inner text of the first fenced block tagged
/// `tsx|jsx|typescript|javascript|ts|js`, or the whole trimmed reply when there is none.
pub fn extract_code(response: &str) -> String {
    find_fenced_block(response).map_or_else(
        || response.trim().to_owned(),
        |(inner, _)| inner.to_owned(),
    )
}

/// Prose that precedes the first fenced block, trimmed. Empty when there is none.
pub fn leading_prose(response: &str) -> &str {
    find_fenced_block(response).map_or("", |(_, start)| response[..start].trim())
}
