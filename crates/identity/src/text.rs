//! ASCII case-insensitive string helpers.
//!
//! Identifiers are hexadecimal, so ASCII folding is all the comparison ever
//! needs.

/// Returns `true` if `needle` occurs anywhere in `haystack`, ignoring ASCII
/// case. An empty needle is always contained.
///
/// ```
/// use nspsync_identity::contains_ignore_case;
/// assert!(contains_ignore_case("Game [0100abcdef120000].nsp", "0100ABCDEF120000"));
/// assert!(!contains_ignore_case("Game.nsp", "0100"));
/// ```
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return true;
    }
    haystack.as_bytes().windows(needle.len()).any(|window| window.eq_ignore_ascii_case(needle))
}

/// Returns `true` if `value` starts with `prefix`, ignoring ASCII case.
pub fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.as_bytes().get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}
