use regex::Regex;
use std::sync::LazyLock;

/// Number of leading characters shared by a base title and all of its
/// updates and DLCs.
pub const FAMILY_PREFIX_LEN: usize = 12;
/// Exact length of a base title identifier.
pub const BASE_ID_LEN: usize = 16;
/// Base title identifiers end with this suffix.
pub const BASE_SUFFIX: &str = "0000";
/// Update identifiers end with this suffix (base + 0x800).
pub const UPDATE_SUFFIX: &str = "800";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// First `[v` up to the next closing bracket. The leftmost match is always the
// first `[v` in the name: if that one is never closed, no later one can be.
regex!(VERSION_TAG_REGEX, r"\[v([^\]]*)\]");
