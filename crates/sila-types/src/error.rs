use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid name: {0:?} (names must not be blank)")]
    InvalidName(String),

    #[error("invalid node id: {0:?}")]
    InvalidId(String),
}
