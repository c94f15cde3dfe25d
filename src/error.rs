use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    /// The command line names an impossible run.
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
    #[display("directory does not exist: {}", _0.display())]
    MissingDirectory(#[error(not(source))] PathBuf),
    #[display("could not open storage")]
    Storage,
    /// The run stopped before it got through everything.
    #[display("synchronization did not complete")]
    Incomplete,
}
