use crate::consts::{BASE_ID_LEN, BASE_SUFFIX, FAMILY_PREFIX_LEN, UPDATE_SUFFIX};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};

/// Extracts the identifier from a package name: the substring between the
/// first `[` and the next `]`.
///
/// Returns `None` when there is no bracket pair, or when the brackets are
/// empty. No validation of length or hex content happens here.
///
/// ```
/// use nspsync_identity::extract_id;
/// assert_eq!(extract_id("Game [0100ABCDEF120000][v65536].nsp"), Some("0100ABCDEF120000"));
/// assert_eq!(extract_id("Game (no tags).nsp"), None);
/// assert_eq!(extract_id("Broken [tag"), None);
/// ```
pub fn extract_id(name: &str) -> Option<&str> {
    let start = name.find('[')?;
    let rest = &name[start + 1..];
    let end = rest.find(']')?;
    Some(&rest[..end]).filter(|id| !id.is_empty())
}

/// Returns `true` if `id` names a base title: exactly 16 characters, ending
/// in `0000` (case-insensitive).
///
/// ```
/// use nspsync_identity::is_base;
/// assert!(is_base("0100ABCDEF120000"));
/// assert!(!is_base("0100ABCDEF120800")); // update
/// assert!(!is_base("0100ABCDEF120001")); // DLC
/// ```
pub fn is_base(id: &str) -> bool {
    id.len() == BASE_ID_LEN && ends_with_ignore_case(id, BASE_SUFFIX)
}

/// Returns the family prefix of `id`: its first 12 characters, or the whole
/// identifier if it is shorter.
///
/// ```
/// use nspsync_identity::family_prefix;
/// assert_eq!(family_prefix("0100ABCDEF120000"), "0100ABCDEF12");
/// assert_eq!(family_prefix("0100"), "0100");
/// ```
pub fn family_prefix(id: &str) -> &str {
    match id.char_indices().nth(FAMILY_PREFIX_LEN) {
        Some((boundary, _)) => &id[..boundary],
        None => id,
    }
}

fn ends_with_ignore_case(value: &str, suffix: &str) -> bool {
    value.len() >= suffix.len()
        && value.as_bytes()[value.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

/// What kind of package an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// The root application package.
    Base,
    /// A patch for a base title (identifier ends in `800`).
    Update,
    /// Downloadable content.
    Dlc,
    /// The identifier doesn't have the canonical length.
    Unknown,
}
impl ContentKind {
    pub fn of(id: &str) -> Self {
        if id.len() != BASE_ID_LEN {
            Self::Unknown
        } else if is_base(id) {
            Self::Base
        } else if ends_with_ignore_case(id, UPDATE_SUFFIX) {
            Self::Update
        } else {
            Self::Dlc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Update => "update",
            Self::Dlc => "dlc",
            Self::Unknown => "unknown",
        }
    }
}
impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A title identifier, compared and hashed without regard to ASCII case.
///
/// The original spelling is kept for display, so a destination that names
/// its files in lowercase still gets reported the way it was found.
///
/// ```
/// use nspsync_identity::TitleId;
/// let upper = TitleId::new("0100ABCDEF120000");
/// let lower = TitleId::new("0100abcdef120000");
/// assert_eq!(upper, lower);
/// assert_eq!(lower.to_string(), "0100abcdef120000");
/// ```
#[derive(Debug, Clone, Eq)]
pub struct TitleId(String);
impl TitleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of the first bracket pair in `name`, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        extract_id(name).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// See [`family_prefix`].
    pub fn family(&self) -> &str {
        family_prefix(&self.0)
    }

    /// Whether `other` belongs to the same family as this identifier.
    pub fn same_family(&self, other: &str) -> bool {
        crate::text::starts_with_ignore_case(other, self.family())
    }

    /// See [`is_base`].
    pub fn is_base(&self) -> bool {
        is_base(&self.0)
    }

    pub fn kind(&self) -> ContentKind {
        ContentKind::of(&self.0)
    }
}
impl PartialEq for TitleId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}
impl Hash for TitleId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `eq`: hash the folded bytes, plus a terminator like `str` does.
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_uppercase());
        }
        state.write_u8(0xff);
    }
}
// No `Borrow<str>`: `str` hashes case-sensitively, so map lookups must go
// through a `TitleId` key.
impl AsRef<str> for TitleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl Display for TitleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
impl From<&str> for TitleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
impl From<String> for TitleId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    #[rstest]
    #[case("Game [0100ABCDEF120000][v65536].nsp", Some("0100ABCDEF120000"))]
    #[case("[0100ABCDEF120800] Update.nsp", Some("0100ABCDEF120800"))]
    #[case("Game (EU) [0100ABCDEF120001].nsz", Some("0100ABCDEF120001"))]
    #[case("Game [not hex at all].nsp", Some("not hex at all"))]
    #[case("Game [].nsp", None)]
    #[case("Game ]backwards[.nsp", None)]
    #[case("Game [unterminated.nsp", None)]
    #[case("Game.nsp", None)]
    #[case("", None)]
    fn test_extract_id(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_id(name), expected);
    }

    #[rstest]
    #[case("0100ABCDEF120000", true)]
    #[case("0100abcdef120000", true)]
    #[case("0100ABCDEF120800", false)]
    #[case("0100ABCDEF120001", false)]
    #[case("0100ABCDEF12000", false)]
    #[case("0100ABCDEF1200000", false)]
    #[case("", false)]
    fn test_is_base(#[case] id: &str, #[case] expected: bool) {
        assert_eq!(is_base(id), expected);
    }

    #[rstest]
    #[case("0100ABCDEF120000", "0100ABCDEF12")]
    #[case("0100ABCDEF120800", "0100ABCDEF12")]
    #[case("0100ABCDEF121001", "0100ABCDEF12")]
    #[case("0100ABCDEF12", "0100ABCDEF12")]
    #[case("0100", "0100")]
    #[case("", "")]
    // Never splits a multi-byte character.
    #[case("ééééééééééééé", "éééééééééééé")]
    fn test_family_prefix(#[case] id: &str, #[case] expected: &str) {
        let prefix = family_prefix(id);
        assert_eq!(prefix, expected);
        assert_eq!(prefix.chars().count(), id.chars().count().min(FAMILY_PREFIX_LEN));
    }

    #[rstest]
    #[case("0100ABCDEF120000", ContentKind::Base)]
    #[case("0100ABCDEF120800", ContentKind::Update)]
    #[case("0100ABCDEF121001", ContentKind::Dlc)]
    #[case("0100ABCDEF120001", ContentKind::Dlc)]
    #[case("0100", ContentKind::Unknown)]
    fn test_content_kind(#[case] id: &str, #[case] expected: ContentKind) {
        assert_eq!(ContentKind::of(id), expected);
    }

    #[test]
    fn test_title_id_hash_ignores_case() {
        let mut map = HashMap::new();
        map.insert(TitleId::new("0100ABCDEF120000"), "upper");
        assert_eq!(map.get(&TitleId::new("0100abcdef120000")), Some(&"upper"));
        assert_eq!(map.get(&TitleId::new("0100ABCDEF120800")), None);
    }

    #[test]
    fn test_title_id_same_family() {
        let id = TitleId::new("0100ABCDEF120800");
        assert!(id.same_family("0100abcdef120000"));
        assert!(id.same_family("0100ABCDEF121001"));
        assert!(!id.same_family("0100ABCDEF130000"));
    }
}
