//! Indexing, matching and version-precedence decisions for package
//! collections, and the sync runs built on them.

pub mod decision;
pub mod error;
pub mod index;
pub mod installed;
pub mod matcher;
pub mod sync;
pub mod transfer;

use crate::sync::Transport;
use crate::transfer::Executor;

/// Everything a sync run needs besides its two backends.
pub struct Context {
    pub executor: Executor,
    pub transport: Transport,
    /// Byte difference [`sync::compare`] tolerates between two copies.
    pub size_tolerance: u64,
}
