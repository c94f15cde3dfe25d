use crate::id::TitleId;
use crate::version::extract_version;

/// Everything a package name says about the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// `None` when the name carries no (non-empty) bracket tag.
    pub id: Option<TitleId>,
    /// `0` when the name carries no version tag.
    pub version: u64,
}
impl Identity {
    pub fn parse(name: &str) -> Self {
        Self {
            id: TitleId::from_name(name),
            version: extract_version(name),
        }
    }

    /// Whether this package belongs to the family `prefix`. Unidentified
    /// packages belong to every family, so prefix filters never drop them.
    pub fn in_family(&self, prefix: &str) -> bool {
        match &self.id {
            Some(id) => crate::text::starts_with_ignore_case(id.as_str(), prefix),
            None => true,
        }
    }
}
