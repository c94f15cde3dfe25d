//! Synchronization runs.
//!
//! Every run is a [`Stream`](futures::Stream) of [`SyncEvent`]s. A failure
//! that concerns one package is yielded as an `Err` item and the run carries
//! on; a failure that leaves nothing to compare against ends the stream
//! before [`SyncEvent::Complete`].

mod compare;
pub mod error;
mod event;
mod folders;
mod item;
mod push;

pub use self::compare::compare;
pub use self::event::{Outcome, SkipReason, SyncEvent};
pub use self::folders::synchronize;
pub use self::item::{Placement, Resolve, Transport};
pub use self::push::{PushOptions, push};
