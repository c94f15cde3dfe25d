//! Identity extraction for bracket-tagged package names.
//!
//! Game packages carry their identity in their display name, following the
//! convention `<title> [<16-hex-id>][v<integer>].<ext>`:
//!
//! ```
//! use nspsync_identity::{Identity, extract_id, extract_version, family_prefix, is_base};
//!
//! let name = "Game [0100ABCDEF120800][v65536].nsp";
//! assert_eq!(extract_id(name), Some("0100ABCDEF120800"));
//! assert_eq!(extract_version(name), 65536);
//! assert_eq!(family_prefix("0100ABCDEF120800"), "0100ABCDEF12");
//! assert!(!is_base("0100ABCDEF120800"));
//!
//! let identity = Identity::parse(name);
//! assert_eq!(identity.version, 65536);
//! ```
//!
//! Nothing in this crate validates hex content or performs I/O; malformed
//! tags simply yield whatever lies between the brackets, and a missing
//! version tag means version `0`.

mod consts;
mod id;
mod identity;
mod text;
mod version;

pub use crate::consts::{BASE_ID_LEN, BASE_SUFFIX, FAMILY_PREFIX_LEN, UPDATE_SUFFIX};
pub use crate::id::{ContentKind, TitleId, extract_id, family_prefix, is_base};
pub use crate::identity::Identity;
pub use crate::text::{contains_ignore_case, starts_with_ignore_case};
pub use crate::version::extract_version;
