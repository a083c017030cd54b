use std::sync::Arc;
use std::time::Duration;

use futures::{stream, StreamExt, TryStreamExt};
use shared::ballot_keys::{self, VOTERS_PREFIX, VOTES_PREFIX};
use shared::models::*;
use shared::validation::{validate_submission, ValidationError};
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::store::{BallotStore, StoreError, StoredRecord};
use crate::utils::{bounded, encode_record};

const RESET_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("You have already voted")]
    DuplicateVote,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Records votes and derives tallies from the ballot store.
///
/// Holds no vote state of its own: every tally is a fresh scan, so any
/// number of instances can share one store.
pub struct VoteProcessor {
    store: Arc<dyn BallotStore>,
    nominees: Vec<Nominee>,
    timeout: Duration,
}

impl VoteProcessor {
    pub fn new(store: Arc<dyn BallotStore>, nominees: Vec<Nominee>, timeout: Duration) -> Self {
        Self { store, nominees, timeout }
    }

    pub fn nominees(&self) -> &[Nominee] {
        &self.nominees
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError> {
        bounded(self.timeout, self.store.list_by_prefix(prefix)).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        bounded(self.timeout, self.store.delete(key)).await
    }

    /// Records one vote for `request`'s voter.
    ///
    /// The voter marker is created with the store's conditional write before
    /// the vote record is written, so two racing submissions from one voter
    /// yield exactly one vote. If the vote write definitely failed the marker
    /// is removed again and nothing is left behind; if its outcome is unknown
    /// the marker stays, so a retry can never add a second vote.
    #[instrument(skip(self, request))]
    pub async fn submit_vote(&self, request: &SubmitVoteRequest) -> Result<Tally, SubmitError> {
        let ballot = validate_submission(request, &self.nominees)?;
        let nominee = ballot.nominee;

        let existing = self.list(&ballot_keys::voter_prefix(&ballot.voter_id)).await?;
        if !existing.is_empty() {
            debug!("Voter already has {} marker(s)", existing.len());
            return Err(SubmitError::DuplicateVote);
        }

        let now = OffsetDateTime::now_utc();
        let marker_key = ballot_keys::voter_marker_key(&ballot.voter_id);
        let marker = encode_record(&marker_key, &VoterMarker::new(&ballot.voter_id, now))?;
        if !bounded(self.timeout, self.store.create(&marker_key, &marker)).await? {
            debug!("Lost marker race for voter");
            return Err(SubmitError::DuplicateVote);
        }

        let vote_key = ballot_keys::vote_key(nominee.id, now, Uuid::new_v4());
        let record = VoteRecord {
            nominee_id: nominee.id,
            nominee_name: nominee.name.clone(),
            voter_id: ballot.voter_id.clone(),
            timestamp: now,
        };
        let written = match encode_record(&vote_key, &record) {
            Ok(value) => bounded(self.timeout, self.store.put(&vote_key, &value)).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if self.vote_definitely_absent(&e, &vote_key).await {
                self.release_marker(&marker_key).await;
            } else {
                warn!("Vote write outcome unknown ({}), keeping voter marker", e);
            }
            return Err(e.into());
        }

        info!("✓ Vote for {} recorded", nominee.name);
        Ok(self.tally().await?)
    }

    /// A timed-out write may still commit after the future is dropped, so
    /// only a definite failure with no record at `vote_key` counts as absent.
    async fn vote_definitely_absent(&self, cause: &StoreError, vote_key: &str) -> bool {
        if matches!(cause, StoreError::Timeout(_)) {
            return false;
        }
        matches!(bounded(self.timeout, self.store.get(vote_key)).await, Ok(None))
    }

    async fn release_marker(&self, marker_key: &str) {
        match self.delete(marker_key).await {
            Ok(_) => debug!("Released voter marker after failed vote write"),
            Err(e) => error!("✗ Orphaned voter marker {}: {}", marker_key, e),
        }
    }

    /// Scans every vote record. Records naming an unknown nominee are skipped.
    pub async fn tally(&self) -> Result<Tally, StoreError> {
        let records = self.list(VOTES_PREFIX).await?;
        Ok(shared::count_votes(
            &self.nominees,
            records.iter().map(|r| (r.key.as_str(), &r.value)),
        ))
    }

    /// Read path for the results view: storage failures degrade to zeros.
    pub async fn tally_or_default(&self) -> Tally {
        match self.tally().await {
            Ok(tally) => tally,
            Err(e) => {
                error!("Failed to read tally, serving zeros: {}", e);
                Tally::zeroed(&self.nominees)
            }
        }
    }

    /// Deletes every vote record, and every voter marker when
    /// `clear_voters` is set. Markers left in place keep those voters
    /// ineligible for the next round.
    #[instrument(skip(self))]
    pub async fn reset(&self, clear_voters: bool) -> Result<ResetSummary, StoreError> {
        let votes_deleted = self.delete_all(VOTES_PREFIX).await?;
        info!("🗑️ Removed {} vote records", votes_deleted);

        let voters_cleared = if clear_voters {
            let cleared = self.delete_all(VOTERS_PREFIX).await?;
            info!("🗑️ Removed {} voter markers", cleared);
            Some(cleared)
        } else {
            warn!("Voter markers retained: previous voters remain unable to vote");
            None
        };

        let message = match voters_cleared {
            Some(_) => "All votes and voter records have been reset".to_string(),
            None => "All votes have been reset; voters who already voted still cannot vote again".to_string(),
        };

        Ok(ResetSummary {
            success: true,
            message,
            votes_deleted,
            voters_cleared,
        })
    }

    async fn delete_all(&self, prefix: &str) -> Result<usize, StoreError> {
        let records = self.list(prefix).await?;
        stream::iter(records)
            .map(move |record| async move { self.delete(&record.key).await })
            .buffer_unordered(RESET_CONCURRENCY)
            .try_fold(0usize, |deleted, existed| async move {
                Ok(deleted + usize::from(existed))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn processor_with(store: Arc<dyn BallotStore>) -> VoteProcessor {
        VoteProcessor::new(
            store,
            vec![Nominee::new(1, "A"), Nominee::new(2, "B")],
            Duration::from_secs(1),
        )
    }

    fn processor() -> (VoteProcessor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (processor_with(store.clone()), store)
    }

    fn as_pairs(tally: &Tally) -> Vec<(NomineeId, u64)> {
        tally.counts().iter().map(|(k, v)| (*k, *v)).collect()
    }

    /// Wraps a memory store and fails on demand.
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryStore,
        fail_vote_writes: AtomicBool,
        fail_after_vote_commit: AtomicBool,
        stall_after_vote_commit: AtomicBool,
        fail_everything: AtomicBool,
        stall_lists: AtomicBool,
    }

    impl FaultyStore {
        fn check(&self) -> Result<(), StoreError> {
            if self.fail_everything.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("store offline".into()));
            }
            Ok(())
        }
    }

    #[rocket::async_trait]
    impl BallotStore for FaultyStore {
        async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
            self.check()?;
            if key.starts_with(VOTES_PREFIX) && self.fail_vote_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("write rejected".into()));
            }
            self.inner.put(key, value).await?;
            if key.starts_with(VOTES_PREFIX) {
                if self.stall_after_vote_commit.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                if self.fail_after_vote_commit.load(Ordering::SeqCst) {
                    return Err(StoreError::Backend("connection reset".into()));
                }
            }
            Ok(())
        }

        async fn create(&self, key: &str, value: &Value) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.create(key, value).await
        }

        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.check()?;
            self.inner.get(key).await
        }

        async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError> {
            self.check()?;
            if self.stall_lists.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.inner.list_by_prefix(prefix).await
        }

        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_voting_scenario() {
        let (processor, _) = processor();

        let tally = processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await.unwrap();
        assert_eq!(as_pairs(&tally), vec![(1, 1), (2, 0)]);

        assert_eq!(
            processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await,
            Err(SubmitError::DuplicateVote)
        );
        assert_eq!(as_pairs(&processor.tally().await.unwrap()), vec![(1, 1), (2, 0)]);

        let tally = processor.submit_vote(&SubmitVoteRequest::new(2, "v2")).await.unwrap();
        assert_eq!(as_pairs(&tally), vec![(1, 1), (2, 1)]);

        assert_eq!(
            processor.submit_vote(&SubmitVoteRequest::new(99, "v3")).await,
            Err(SubmitError::Invalid(ValidationError::UnknownNominee(99)))
        );
        assert_eq!(as_pairs(&processor.tally().await.unwrap()), vec![(1, 1), (2, 1)]);
    }

    #[tokio::test]
    async fn test_total_matches_distinct_voters() {
        let (processor, _) = processor();
        let voters = ["a", "b", "c", "d", "e"];
        for (i, voter) in voters.iter().enumerate() {
            let nominee = if i % 2 == 0 { 1 } else { 2 };
            processor.submit_vote(&SubmitVoteRequest::new(nominee, *voter)).await.unwrap();
            let _ = processor.submit_vote(&SubmitVoteRequest::new(1, *voter)).await;
        }
        let tally = processor.tally().await.unwrap();
        assert_eq!(tally.total(), voters.len() as u64);
        assert_eq!(tally.count(1), Some(3));
        assert_eq!(tally.count(2), Some(2));
    }

    #[tokio::test]
    async fn test_rejections_leave_store_untouched() {
        let (processor, store) = processor();
        let missing = SubmitVoteRequest { nominee_id: None, voter_id: Some("v1".into()) };
        assert!(matches!(
            processor.submit_vote(&missing).await,
            Err(SubmitError::Invalid(ValidationError::MissingField))
        ));
        assert!(processor.submit_vote(&SubmitVoteRequest::new(42, "v1")).await.is_err());
        assert_eq!(store.len().await, 0);
        assert_eq!(processor.tally().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_successful_vote_writes_record_and_marker() {
        let (processor, store) = processor();
        processor.submit_vote(&SubmitVoteRequest::new(2, "voter/with/slashes")).await.unwrap();

        let votes = store.list_by_prefix(VOTES_PREFIX).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].value["nomineeName"], json!("B"));
        assert_eq!(votes[0].value["voterId"], json!("voter/with/slashes"));

        let markers = store.list_by_prefix(VOTERS_PREFIX).await.unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].value["voted"], json!(true));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_from_one_voter() {
        let (processor, _) = processor();
        let processor = Arc::new(processor);
        let attempts = (0..8).map(|i| {
            let processor = processor.clone();
            tokio::spawn(async move {
                processor
                    .submit_vote(&SubmitVoteRequest::new(1 + (i % 2), "racer"))
                    .await
            })
        });
        let results = futures::future::join_all(attempts).await;
        let accepted = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(SubmitError::DuplicateVote))))
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(processor.tally().await.unwrap().total(), 1);
    }

    #[tokio::test]
    async fn test_failed_vote_write_releases_marker() {
        let store = Arc::new(FaultyStore::default());
        let processor = processor_with(store.clone());

        store.fail_vote_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await,
            Err(SubmitError::Storage(_))
        ));
        assert_eq!(store.inner.len().await, 0);

        store.fail_vote_writes.store(false, Ordering::SeqCst);
        let tally = processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await.unwrap();
        assert_eq!(tally.total(), 1);
    }

    async fn votes_by(store: &FaultyStore, voter: &str) -> usize {
        store
            .inner
            .list_by_prefix(VOTES_PREFIX)
            .await
            .unwrap()
            .iter()
            .filter(|r| r.value["voterId"] == json!(voter))
            .count()
    }

    #[tokio::test]
    async fn test_timed_out_vote_write_keeps_marker() {
        let store = Arc::new(FaultyStore::default());
        let processor = VoteProcessor::new(
            store.clone(),
            vec![Nominee::new(1, "A")],
            Duration::from_millis(50),
        );
        store.stall_after_vote_commit.store(true, Ordering::SeqCst);

        assert_eq!(
            processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await,
            Err(SubmitError::Storage(StoreError::Timeout(Duration::from_millis(50))))
        );
        assert_eq!(
            processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await,
            Err(SubmitError::DuplicateVote)
        );
        assert_eq!(votes_by(&store, "v1").await, 1);
        assert_eq!(store.inner.list_by_prefix(VOTERS_PREFIX).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_committed_vote_with_failed_reply_keeps_marker() {
        let store = Arc::new(FaultyStore::default());
        let processor = processor_with(store.clone());
        store.fail_after_vote_commit.store(true, Ordering::SeqCst);

        assert!(matches!(
            processor.submit_vote(&SubmitVoteRequest::new(2, "v1")).await,
            Err(SubmitError::Storage(StoreError::Backend(_)))
        ));

        store.fail_after_vote_commit.store(false, Ordering::SeqCst);
        assert_eq!(
            processor.submit_vote(&SubmitVoteRequest::new(2, "v1")).await,
            Err(SubmitError::DuplicateVote)
        );
        assert_eq!(votes_by(&store, "v1").await, 1);
        assert_eq!(as_pairs(&processor.tally().await.unwrap()), vec![(1, 0), (2, 1)]);
    }

    #[tokio::test]
    async fn test_read_path_degrades_to_zero() {
        let store = Arc::new(FaultyStore::default());
        let processor = processor_with(store.clone());
        processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await.unwrap();

        store.fail_everything.store(true, Ordering::SeqCst);
        assert!(processor.tally().await.is_err());
        let tally = processor.tally_or_default().await;
        assert_eq!(as_pairs(&tally), vec![(1, 0), (2, 0)]);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = Arc::new(FaultyStore::default());
        let processor = VoteProcessor::new(
            store.clone(),
            vec![Nominee::new(1, "A")],
            Duration::from_millis(20),
        );
        store.stall_lists.store(true, Ordering::SeqCst);
        assert_eq!(
            processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await,
            Err(SubmitError::Storage(StoreError::Timeout(Duration::from_millis(20))))
        );
        assert_eq!(store.inner.len().await, 0);
    }

    #[tokio::test]
    async fn test_reads_are_idempotent() {
        let (processor, _) = processor();
        processor.submit_vote(&SubmitVoteRequest::new(2, "v1")).await.unwrap();
        assert_eq!(processor.tally().await.unwrap(), processor.tally().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_nominee_records_are_ignored() {
        let (processor, store) = processor();
        store.put("votes/nominee-9-legacy.json", &json!({ "nomineeId": 9 })).await.unwrap();
        store.put("votes/nominee-2.json", &json!({})).await.unwrap();
        store.put("votes/imported.json", &json!({ "nomineeId": 1 })).await.unwrap();
        assert_eq!(as_pairs(&processor.tally().await.unwrap()), vec![(1, 1), (2, 1)]);
    }

    #[tokio::test]
    async fn test_reset_keeps_voters_by_default() {
        let (processor, _) = processor();
        processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await.unwrap();
        processor.submit_vote(&SubmitVoteRequest::new(2, "v2")).await.unwrap();

        let summary = processor.reset(false).await.unwrap();
        assert_eq!(summary.votes_deleted, 2);
        assert_eq!(summary.voters_cleared, None);
        assert_eq!(as_pairs(&processor.tally().await.unwrap()), vec![(1, 0), (2, 0)]);
        assert_eq!(
            processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await,
            Err(SubmitError::DuplicateVote)
        );
    }

    #[tokio::test]
    async fn test_reset_can_clear_voters() {
        let (processor, store) = processor();
        processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await.unwrap();

        let summary = processor.reset(true).await.unwrap();
        assert_eq!(summary.votes_deleted, 1);
        assert_eq!(summary.voters_cleared, Some(1));
        assert_eq!(store.len().await, 0);
        assert!(processor.submit_vote(&SubmitVoteRequest::new(1, "v1")).await.is_ok());
    }
}
