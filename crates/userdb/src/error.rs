//! Error types for userdb

use thiserror::Error;

use crate::user::UserId;

/// Result type alias for userdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Raw id is not an integer
    #[error("invalid user id: {0:?}")]
    InvalidId(String),

    /// Id is well-formed but absent from the catalog
    #[error("user {0} not found")]
    NotFound(UserId),
}
