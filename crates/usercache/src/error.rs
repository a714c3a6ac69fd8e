//! Lookup failure taxonomy

use thiserror::Error;

/// Every way a lookup can fail
///
/// `InvalidId` and `NotFound` are ordinary client outcomes. `Internal`
/// signals a defect; its detail stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Raw id is not an integer
    #[error("invalid user id")]
    InvalidId,

    /// Id does not resolve in the store
    #[error("user id not found")]
    NotFound,

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl LookupError {
    /// HTTP status code and API-safe message
    pub fn server_error(&self) -> (u16, &'static str) {
        match self {
            LookupError::InvalidId => (400, "invalid user id"),
            LookupError::NotFound => (404, "user id not found"),
            LookupError::Internal(_) => (500, "internal error"),
        }
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.server_error().0
    }

    /// Message safe to hand to a client
    pub fn safe_message(&self) -> &'static str {
        self.server_error().1
    }

    /// Whether this is a normal client-facing outcome rather than a defect
    pub fn is_expected(&self) -> bool {
        !matches!(self, LookupError::Internal(_))
    }
}

impl From<userdb::Error> for LookupError {
    fn from(err: userdb::Error) -> Self {
        match err {
            userdb::Error::InvalidId(_) => LookupError::InvalidId,
            userdb::Error::NotFound(_) => LookupError::NotFound,
        }
    }
}

impl From<tokio::task::JoinError> for LookupError {
    fn from(err: tokio::task::JoinError) -> Self {
        LookupError::Internal(format!("fetch task failed: {}", err))
    }
}
