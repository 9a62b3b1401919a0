//! Errors raised while serving an operation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("property not found: {0}")]
    NotFound(String),

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("{0} is not an object")]
    NotAnObject(String),

    #[error("expected a JSON object at the root of the object tree")]
    InvalidTree,
}

pub type Result<T> = std::result::Result<T, PeerError>;
