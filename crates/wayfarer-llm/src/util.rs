//! Shared helpers for providers

const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Mask an API key for logs: first and last four characters only.
///
/// # Examples
/// ```
/// use wayfarer_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("AIza1234567890abcd"), "AIza...abcd");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY || !key.is_ascii() {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        &key[..KEY_MASK_VISIBLE_CHARS],
        &key[key.len() - KEY_MASK_VISIBLE_CHARS..]
    )
}

/// Truncate to at most `max_bytes` without splitting a UTF-8 character.
#[must_use]
pub fn truncate_safe(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_safe_respects_char_boundary() {
        assert_eq!(truncate_safe("hello", 10), "hello");
        assert_eq!(truncate_safe("hello", 3), "hel");
        // "é" is two bytes
        assert_eq!(truncate_safe("é", 1), "");
    }
}
