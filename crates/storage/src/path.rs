//! Path validation.
//!
//! Backends only ever accept paths relative to their root. Validation
//! normalizes a path and rejects anything that would climb out of the root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a root-relative storage path.
///
/// `.` components and repeated separators disappear, `..` is resolved
/// lexically, and a leading `/` is ignored. Paths that resolve to nothing,
/// escape the root, carry a Windows prefix or contain a null byte are
/// rejected with [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use nspsync_storage::validate_path;
/// assert!(validate_path("GameA/GameA [0100000000000000][v0].nsp").is_ok());
/// assert!(validate_path("GameA/../GameB/file.nsp").is_ok());
/// assert!(validate_path("../outside.nsp").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("GameA/./Updates//file.nsp/").unwrap(),
///     Path::new("GameA/Updates/file.nsp")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}
