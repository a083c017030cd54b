use std::sync::Arc;
use std::time::Duration as CallTimeout;

use shared::ballot_keys::TIMER_KEY;
use shared::models::TimerRecord;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::store::{BallotStore, StoreError};
use crate::utils::{bounded, decode_record, encode_record};

/// Voting deadline shared by every instance. The first caller to find no
/// timer record creates one; everyone after reads that record.
pub struct Countdown {
    store: Arc<dyn BallotStore>,
    span: Duration,
    timeout: CallTimeout,
}

impl Countdown {
    pub fn new(store: Arc<dyn BallotStore>, span: Duration, timeout: CallTimeout) -> Self {
        Self { store, span, timeout }
    }

    async fn read(&self) -> Result<Option<TimerRecord>, StoreError> {
        bounded(self.timeout, self.store.get(TIMER_KEY))
            .await?
            .map(|value| decode_record(TIMER_KEY, value))
            .transpose()
    }

    pub async fn deadline(&self) -> Result<OffsetDateTime, StoreError> {
        if let Some(timer) = self.read().await? {
            return Ok(timer.deadline);
        }

        let now = OffsetDateTime::now_utc();
        let timer = TimerRecord {
            deadline: now + self.span,
            created_at: now,
        };
        let value = encode_record(TIMER_KEY, &timer)?;
        if bounded(self.timeout, self.store.create(TIMER_KEY, &value)).await? {
            info!("⏱️ Countdown started, voting closes at {}", timer.deadline);
            return Ok(timer.deadline);
        }

        debug!("Another instance created the timer first");
        self.read()
            .await?
            .map(|timer| timer.deadline)
            .ok_or_else(|| StoreError::Backend("timer record vanished after creation".into()))
    }
}
