use crate::decision::Reason;
use crate::matcher::MatchKind;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// Progress events emitted by the sync orchestrators.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`Indexed`](Self::Indexed), exactly once, after the destination (or
///    device) has been scanned.
/// 3. [`FolderMatched`](Self::FolderMatched) / [`FolderUnmatched`](Self::FolderUnmatched)
///    and [`Processed`](Self::Processed), zero or more times.
/// 4. [`Complete`](Self::Complete), exactly once, signalling the stream is
///    finished.
///
/// A fatal error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Started,
    /// The number of entries the run will compare against.
    Indexed(usize),
    /// A source folder was anchored to a destination folder.
    FolderMatched { source: PathBuf, destination: PathBuf, kind: MatchKind },
    /// No file in a source folder relates to anything at the destination.
    FolderUnmatched { source: PathBuf },
    Processed(Outcome),
    Complete,
}

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Copied or moved to `destination`, after purging `purged`.
    Transferred { source: PathBuf, destination: PathBuf, purged: Vec<PathBuf>, reason: Reason },
    /// The destination already has it (or better); `tidied` if the source
    /// copy was removed as redundant.
    UpToDate { source: PathBuf, reason: Reason, tidied: bool },
    /// Not considered at all.
    Skipped { source: PathBuf, reason: SkipReason },
    /// Nothing at the destination relates to it.
    Unmatched { source: PathBuf },
    /// The destination copy was the wrong size and has been replaced.
    Repaired { source: PathBuf, destination: PathBuf, difference: u64 },
    /// The destination copy is within tolerance.
    Verified { source: PathBuf, destination: PathBuf },
}
impl Outcome {
    pub fn source(&self) -> &PathBuf {
        match self {
            Self::Transferred { source, .. }
            | Self::UpToDate { source, .. }
            | Self::Skipped { source, .. }
            | Self::Unmatched { source }
            | Self::Repaired { source, .. }
            | Self::Verified { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Zero-length file.
    Empty,
    /// No identifier in the file name.
    Unidentified,
    /// Belongs to a different family than the folder it was found in.
    ForeignFamily,
    /// Base titles are only pushed on request.
    BaseTitle,
    /// The device already has this base title.
    AlreadyInstalled,
}
impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Empty => "empty file",
            Self::Unidentified => "no identifier",
            Self::ForeignFamily => "identifier prefix mismatch",
            Self::BaseTitle => "base title",
            Self::AlreadyInstalled => "already installed",
        })
    }
}
