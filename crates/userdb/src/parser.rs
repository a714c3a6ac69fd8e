//! User id parser using nom
//!
//! Accepted grammar:
//! ```text
//! id := ["+" | "-"] digit+
//! ```
//! The whole input must match; no surrounding whitespace. Values outside
//! the `i64` range are rejected rather than clamped.

use nom::{
    character::complete::{digit1, one_of},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::pair,
    IResult,
};

use crate::error::{Error, Result};
use crate::user::UserId;

fn signed_id(input: &str) -> IResult<&str, UserId> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse::<UserId>)(input)
}

/// Parse a raw request parameter into a [`UserId`]
///
/// Only syntax is checked here. Zero and negative ids parse fine and are
/// left for the store to reject as not found.
pub fn parse_user_id(raw: &str) -> Result<UserId> {
    all_consuming(signed_id)(raw)
        .map(|(_, id)| id)
        .map_err(|_| Error::InvalidId(raw.to_string()))
}
