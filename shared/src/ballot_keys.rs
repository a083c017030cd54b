//! Key layout of the ballot store.
//!
//! ```text
//! votes/nominee-<id>-<timestamp>-<suffix>.json   one per accepted vote
//! voters/<encoded voter id>/ballot.json          one per voter who voted
//! timer/deadline.json                            countdown deadline
//! maintenance.json                               maintenance flag
//! ```
//!
//! Voter ids are opaque client strings, so they are base64url encoded before
//! becoming a path segment. An id containing `/` must never share a prefix
//! with another voter's namespace.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::NomineeId;

pub const VOTES_PREFIX: &str = "votes/";
pub const VOTERS_PREFIX: &str = "voters/";
pub const TIMER_KEY: &str = "timer/deadline.json";
pub const MAINTENANCE_KEY: &str = "maintenance.json";

const NOMINEE_PREFIX: &str = "votes/nominee-";

/// RFC 3339 timestamp with `:` and `.` replaced so it is safe inside a key.
pub fn key_timestamp(at: OffsetDateTime) -> String {
    let formatted = at
        .format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp_nanos().to_string());
    formatted.replace(|c: char| c == ':' || c == '.', "-")
}

pub fn vote_key(nominee_id: NomineeId, at: OffsetDateTime, suffix: Uuid) -> String {
    format!(
        "{}{}-{}-{}.json",
        NOMINEE_PREFIX,
        nominee_id,
        key_timestamp(at),
        suffix.simple()
    )
}

/// Extracts the nominee id from a vote key. Also accepts the older
/// `votes/nominee-<id>.json` form.
pub fn parse_vote_key(key: &str) -> Option<NomineeId> {
    let rest = key.strip_prefix(NOMINEE_PREFIX)?;
    let digits = rest.split(|c: char| !c.is_ascii_digit()).next()?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub fn encode_voter(voter_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(voter_id.as_bytes())
}

pub fn voter_prefix(voter_id: &str) -> String {
    format!("{}{}/", VOTERS_PREFIX, encode_voter(voter_id))
}

pub fn voter_marker_key(voter_id: &str) -> String {
    format!("{}ballot.json", voter_prefix(voter_id))
}
