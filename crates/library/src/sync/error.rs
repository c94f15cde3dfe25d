//! Error types for the [`sync`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A sync error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a sync failure.
///
/// ### Fatal (the run stops)
/// - [`ErrorKind::Index`]
/// - [`ErrorKind::SourceUnavailable`]
///
/// ### Per item (the run carries on)
/// - [`ErrorKind::Item`], raised over one of
///   [`ErrorKind::Listing`], [`ErrorKind::Transfer`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The destination index or the installed-content scan could not be built.
    #[display("could not index the destination")]
    Index,
    /// The source root could not be listed.
    #[display("source root unavailable: {}", _0.display())]
    SourceUnavailable(#[error(not(source))] PathBuf),
    /// Listing the folder a package would land in failed.
    #[display("could not list target folder")]
    Listing,
    /// Moving, copying or purging a package failed.
    #[display("transfer failed")]
    Transfer,
    /// Processing one package failed.
    #[display("failed to process {}", _0.display())]
    Item(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Listing | Self::Transfer | Self::Item(_))
    }

    /// Returns `true` if the run could not continue past this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Index | Self::SourceUnavailable(_))
    }
}
