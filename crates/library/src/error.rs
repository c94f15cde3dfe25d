//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Sync runs raise their own
//! [`sync::error::ErrorKind`](crate::sync::error::ErrorKind) underneath
//! [`ErrorKind::Sync`].

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A storage backend operation (list, stat, delete) failed.
    #[display("storage operation failed")]
    Storage,
    /// Bytes could not be moved or copied between backends.
    #[display("transfer failed")]
    Transfer,
    /// A synchronization run failed.
    #[display("synchronization failed")]
    Sync,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Transfer)
    }
}
