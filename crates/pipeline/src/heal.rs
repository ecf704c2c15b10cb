//! Repair of truncated JSON emitted by a completion.
//!
//! Models that hit their token limit stop mid-string, leaving output such as
//! `{"answer": "Dental is covered", "thoughts": "used planA`. Closing the
//! open string and the outer object or array is enough to parse it.
//!
//! Only that single trailing truncation is repaired. A cut inside a nested
//! value (an array inside `thoughts`, say) still fails to parse.

/// Heal `text` so a trailing truncation parses.
///
/// 1. Trim, and replace every line break (`\r\n`, `\n`, `\r`) with one space.
/// 2. If that is already valid JSON, return it. This short-circuit is an
///    addition to the classic heal steps (1, 3-5); without it a complete
///    scalar such as `"ok"` or `42` would pick up a stray closer.
/// 3. If it ends with `"` followed by optional whitespace and `}` or `]`,
///    return it.
/// 4. Append `"` unless it already ends with one.
/// 5. Append `}` if it starts with `{`, or `]` if it starts with `[`, and the
///    matching closer is not already last.
///
/// `heal` is idempotent.
pub fn heal(text: &str) -> String {
    let mut result = text
        .trim()
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ");

    if serde_json::from_str::<serde_json::Value>(&result).is_ok() || ends_closed(&result) {
        return result;
    }

    if !result.ends_with('"') {
        result.push('"');
    }

    if result.starts_with('{') && !result.ends_with('}') {
        result.push('}');
    } else if result.starts_with('[') && !result.ends_with(']') {
        result.push(']');
    }

    result
}

/// `"` then optional whitespace then `}` or `]` at the very end.
fn ends_closed(text: &str) -> bool {
    let Some(body) = text.strip_suffix('}').or_else(|| text.strip_suffix(']')) else {
        return false;
    };
    body.trim_end().ends_with('"')
}
