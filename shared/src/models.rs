use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

pub type NomineeId = u32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nominee {
    pub id: NomineeId,
    pub name: String,
}

impl Nominee {
    pub fn new(id: NomineeId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// The nominee list the site shipped with for its first election cycle.
pub fn default_nominees() -> Vec<Nominee> {
    vec![
        Nominee::new(1, "Moon Studio Animation"),
        Nominee::new(2, "Seel"),
        Nominee::new(3, "Epic"),
        Nominee::new(4, "Pool"),
        Nominee::new(5, "Adorable Steve"),
        Nominee::new(6, "Mar"),
        Nominee::new(7, "JSkript"),
    ]
}

/// Browsers send the nominee id either as a JSON number or as the string
/// value of a form control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NomineeRef {
    Id(i64),
    Text(String),
}

impl From<NomineeId> for NomineeRef {
    fn from(id: NomineeId) -> Self {
        NomineeRef::Id(i64::from(id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    #[serde(default)]
    pub nominee_id: Option<NomineeRef>,
    #[serde(default)]
    pub voter_id: Option<String>,
}

impl SubmitVoteRequest {
    pub fn new(nominee_id: NomineeId, voter_id: impl Into<String>) -> Self {
        Self {
            nominee_id: Some(NomineeRef::from(nominee_id)),
            voter_id: Some(voter_id.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub nominee_id: NomineeId,
    pub nominee_name: String,
    pub voter_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoterMarker {
    pub voter_id: String,
    pub voted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl VoterMarker {
    pub fn new(voter_id: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            voter_id: voter_id.into(),
            voted: true,
            timestamp,
        }
    }
}

/// Vote counts keyed by nominee id. Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Tally(BTreeMap<NomineeId, u64>);

impl Tally {
    pub fn zeroed(nominees: &[Nominee]) -> Self {
        Self(nominees.iter().map(|n| (n.id, 0)).collect())
    }

    /// Counts one vote. Ids outside the zeroed set are ignored and reported
    /// back as `false`.
    pub fn record(&mut self, nominee_id: NomineeId) -> bool {
        match self.0.get_mut(&nominee_id) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    pub fn count(&self, nominee_id: NomineeId) -> Option<u64> {
        self.0.get(&nominee_id).copied()
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn counts(&self) -> &BTreeMap<NomineeId, u64> {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResetSummary {
    pub success: bool,
    pub message: String,
    pub votes_deleted: usize,
    pub voters_cleared: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockResponse {
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub current_time: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceRecord {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceStatus {
    pub maintenance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
