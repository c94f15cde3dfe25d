use crate::consts::VERSION_TAG_REGEX;

/// Extracts the version number from the first `[vN]` tag of a package name.
///
/// A missing tag, an unterminated tag or a non-numeric value all mean
/// version `0`. Only the first tag is honored.
///
/// ```
/// use nspsync_identity::extract_version;
/// assert_eq!(extract_version("Title [v131072]"), 131072);
/// assert_eq!(extract_version("Title [v0]"), 0);
/// assert_eq!(extract_version("Title"), 0);
/// ```
pub fn extract_version(name: &str) -> u64 {
    VERSION_TAG_REGEX
        .captures(name)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().trim().parse().ok())
        .unwrap_or(0)
}
