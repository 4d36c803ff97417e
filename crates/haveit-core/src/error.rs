use thiserror::Error;

/// Configuration errors raised before a batch starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Cannot determine a search root: set HAVE or pass --root")]
    HomeNotFound,

    #[error("Invalid max depth {0}: node_modules folders live at depth 1 or deeper")]
    InvalidMaxDepth(usize),
}
