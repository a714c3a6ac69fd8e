//! # userdb
//!
//! Authoritative user catalog backing the lookup service.
//!
//! ## Properties
//! - Built once from a deterministic generator (`User1` .. `UserN`)
//! - Never mutated after construction, unlimited concurrent readers
//! - Every fetch pays a fixed simulated round trip
//! - Strict id parsing shared with the request surface

#![warn(missing_docs)]

mod error;
mod parser;
mod storage;
mod user;

pub use error::{Error, Result};
pub use parser::parse_user_id;
pub use storage::{UserSource, UserStore, DEFAULT_LATENCY, DEFAULT_USERS};
pub use user::{User, UserId};
