//! Family matching: which destination folder should a title go to?

use crate::index::DestinationIndex;
use nspsync_identity::TitleId;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The destination already holds this exact identifier.
    Exact,
    /// The destination holds another member of the same family.
    Family,
}
impl Display for MatchKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Family => "family",
        })
    }
}

/// A resolved destination folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub folder: &'a Path,
    pub kind: MatchKind,
    /// The indexed identifier that produced the match.
    pub via: &'a TitleId,
}

/// Resolve the destination folder for `id`.
///
/// An exact entry always wins. Otherwise the first indexed identifier (in
/// discovery order) that shares the family prefix of `id` is used. Returns
/// `None` when nothing in the index is related; callers must not invent a
/// folder in that case.
pub fn resolve_folder<'a>(index: &'a DestinationIndex, id: &TitleId) -> Option<Match<'a>> {
    if let Some((via, folder)) = index.get_entry(id) {
        return Some(Match { folder, kind: MatchKind::Exact, via });
    }
    index
        .iter()
        .find(|(indexed, _)| id.same_family(indexed.as_str()))
        .map(|(via, folder)| Match { folder, kind: MatchKind::Family, via })
}

/// Resolve a whole source folder from the identifiers of its files.
///
/// Tries each identifier in turn (exact, then family) and returns the first
/// that resolves together with its match.
pub fn resolve_first<'a, 'b>(
    index: &'a DestinationIndex,
    ids: impl IntoIterator<Item = &'b TitleId>,
) -> Option<(&'b TitleId, Match<'a>)> {
    ids.into_iter().find_map(|id| resolve_folder(index, id).map(|found| (id, found)))
}
