//! Version-precedence decisions: copy this package, or leave it?
//!
//! Pure functions over names and sizes; the caller does all I/O, including
//! purging whatever the decision marks as stale.

use nspsync_identity::{Identity, contains_ignore_case, extract_version};
use nspsync_storage::FileInfo;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

/// A package offered for transfer: its source path, name and byte length.
pub type Candidate = FileInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Copy,
    Skip,
}

/// Why a [`Decision`] came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// No identifier; the target path is free.
    Absent,
    /// No identifier; something already occupies the target path.
    Present,
    /// Nothing in the target folder carries this identifier.
    New,
    /// Newer than everything in the target folder.
    Upgrade { from: u64 },
    /// Same version as the target folder's best, but strictly larger.
    Larger { existing: u64 },
    /// The target folder already has this version.
    UpToDate,
    /// The target folder has a newer version.
    Outdated { latest: u64 },
}
impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Absent => f.write_str("target path is free"),
            Self::Present => f.write_str("target path is taken"),
            Self::New => f.write_str("not present"),
            Self::Upgrade { from } => write!(f, "upgrades v{from}"),
            Self::Larger { existing } => write!(f, "larger than existing {existing} bytes"),
            Self::UpToDate => f.write_str("same version present"),
            Self::Outdated { latest } => write!(f, "v{latest} present"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    /// Existing entries to purge before the transfer.
    pub stale: Vec<FileInfo>,
    pub reason: Reason,
}
impl Decision {
    fn copy(reason: Reason) -> Self {
        Self { action: Action::Copy, stale: Vec::new(), reason }
    }

    fn skip(reason: Reason) -> Self {
        Self { action: Action::Skip, stale: Vec::new(), reason }
    }

    pub fn is_copy(&self) -> bool {
        self.action == Action::Copy
    }
}

/// Decide whether `candidate` should be transferred to `target`.
///
/// `existing` is the listing of the target's folder. Matching an existing
/// entry to the candidate is a case-insensitive substring test of the
/// identifier against the entry's file name, so an identifier that happens
/// to occur inside a longer one matches too.
///
/// With `skip_size_tie`, an equal version is never copied; otherwise it is
/// copied only when the candidate is strictly larger than the first existing
/// entry at that version (the transfer then overwrites the target path, and
/// nothing is marked stale).
pub fn decide(candidate: &Candidate, target: &Path, existing: &[FileInfo], skip_size_tie: bool) -> Decision {
    let name = candidate.name();
    let identity = Identity::parse(&name);
    let Some(id) = identity.id else {
        return match existing.iter().any(|entry| entry.path == target) {
            true => Decision::skip(Reason::Present),
            false => Decision::copy(Reason::Absent),
        };
    };

    let matches: Vec<(&FileInfo, u64)> = existing
        .iter()
        .filter(|entry| contains_ignore_case(&entry.name(), id.as_str()))
        .map(|entry| (entry, extract_version(&entry.name())))
        .collect();
    let Some(max) = matches.iter().map(|(_, version)| *version).max() else {
        return Decision::copy(Reason::New);
    };

    let version = identity.version;
    if version > max {
        return Decision {
            action: Action::Copy,
            stale: matches.into_iter().filter(|(_, v)| *v < version).map(|(entry, _)| entry.clone()).collect(),
            reason: Reason::Upgrade { from: max },
        };
    }
    if version < max {
        return Decision::skip(Reason::Outdated { latest: max });
    }
    if skip_size_tie {
        return Decision::skip(Reason::UpToDate);
    }
    match matches.iter().find(|(_, v)| *v == max) {
        Some((entry, _)) if candidate.size > entry.size => Decision::copy(Reason::Larger { existing: entry.size }),
        _ => Decision::skip(Reason::UpToDate),
    }
}
