use serde_json::Value;

use crate::ballot_keys::parse_vote_key;
use crate::models::{Nominee, NomineeId, Tally};

/// Nominee id of a stored vote: from the key when it parses, otherwise from
/// the record body.
pub fn nominee_of(key: &str, value: &Value) -> Option<NomineeId> {
    parse_vote_key(key).or_else(|| {
        value
            .get("nomineeId")
            .and_then(Value::as_u64)
            .and_then(|id| NomineeId::try_from(id).ok())
    })
}

/// Builds a tally from `(key, value)` pairs of stored vote records. Records
/// naming an unknown nominee are skipped.
pub fn count_votes<'a, I>(nominees: &[Nominee], records: I) -> Tally
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut tally = Tally::zeroed(nominees);
    for (key, value) in records {
        if let Some(id) = nominee_of(key, value) {
            tally.record(id);
        }
    }
    tally
}
