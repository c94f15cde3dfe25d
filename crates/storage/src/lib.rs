//! Storage backends for package collections.
//!
//! A [`StorageBackend`] exposes a tree of files relative to some root: a local
//! directory, a mounted removable device, or (for tests) memory. Everything
//! above this crate talks in root-relative paths and never touches the
//! filesystem directly.
//!
//! Device mounts can stall indefinitely, so directory enumeration is also
//! available with a deadline through [`listing`]: a listing either completes
//! or reports [`Listed::TimedOut`], it never errors because of the clock.

pub mod backend;
pub mod error;
mod file;
pub mod listing;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::file::{DirListing, FileInfo};
pub use crate::listing::Listed;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
