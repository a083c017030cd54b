use crate::error::ErrorKind;
use crate::models::{Nominee, NomineeRef, SubmitVoteRequest};

pub const MAX_VOTER_ID_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing nomineeId or voterId")]
    MissingField,
    #[error("nomineeId must be an integer")]
    MalformedNominee,
    #[error("voterId must not be empty")]
    EmptyVoter,
    #[error("voterId exceeds maximum length of {MAX_VOTER_ID_LENGTH}")]
    VoterTooLong,
    #[error("Invalid nominee ID: {0}")]
    UnknownNominee(i64),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::UnknownNominee(_) => ErrorKind::UnknownNominee,
            _ => ErrorKind::InvalidRequest,
        }
    }
}

/// A submission that passed every check that does not need the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidVote<'a> {
    pub nominee: &'a Nominee,
    pub voter_id: String,
}

pub fn parse_nominee_ref(nominee: &NomineeRef) -> Result<i64, ValidationError> {
    match nominee {
        NomineeRef::Id(id) => Ok(*id),
        NomineeRef::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::MalformedNominee),
    }
}

pub fn validate_submission<'a>(
    request: &SubmitVoteRequest,
    nominees: &'a [Nominee],
) -> Result<ValidVote<'a>, ValidationError> {
    let (Some(nominee_ref), Some(voter_id)) = (&request.nominee_id, &request.voter_id) else {
        return Err(ValidationError::MissingField);
    };

    let voter_id = voter_id.trim();
    if voter_id.is_empty() { return Err(ValidationError::EmptyVoter); }
    if voter_id.len() > MAX_VOTER_ID_LENGTH { return Err(ValidationError::VoterTooLong); }

    let requested = parse_nominee_ref(nominee_ref)?;
    let nominee = nominees
        .iter()
        .find(|n| i64::from(n.id) == requested)
        .ok_or(ValidationError::UnknownNominee(requested))?;

    Ok(ValidVote {
        nominee,
        voter_id: voter_id.to_string(),
    })
}
