//! UTF-8-safe string helpers
//!
//! Content lengths in this crate are counted in characters, never bytes, so
//! truncation must respect character boundaries.

/// Safely truncate a string to a maximum number of CHARACTERS (not bytes).
///
/// Never panics on multi-byte input and never allocates.
///
/// # Examples
/// ```
/// # use websearch_relay::utils::string_utils::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
/// assert_eq!(safe_truncate_chars("搜索引擎", 2), "搜索");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Collapse every run of whitespace (including newlines) into one space and trim.
///
/// ```
/// # use websearch_relay::utils::string_utils::collapse_whitespace;
/// assert_eq!(collapse_whitespace("  rust \n\t async  "), "rust async");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
