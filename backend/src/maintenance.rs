use std::sync::Arc;
use std::time::Duration;

use shared::ballot_keys::MAINTENANCE_KEY;
use shared::models::MaintenanceRecord;
use tracing::{info, warn};

use crate::store::{BallotStore, StoreError};
use crate::utils::{bounded, decode_record, encode_record};

pub struct MaintenanceFlag {
    store: Arc<dyn BallotStore>,
    timeout: Duration,
}

impl MaintenanceFlag {
    pub fn new(store: Arc<dyn BallotStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// A missing, unreadable or malformed flag all mean "not in maintenance".
    pub async fn is_enabled(&self) -> bool {
        let value = match bounded(self.timeout, self.store.get(MAINTENANCE_KEY)).await {
            Ok(Some(value)) => value,
            Ok(None) => return false,
            Err(e) => {
                warn!("Failed to read maintenance flag: {}", e);
                return false;
            }
        };
        match decode_record::<MaintenanceRecord>(MAINTENANCE_KEY, value) {
            Ok(record) => record.enabled,
            Err(e) => {
                warn!("Ignoring malformed maintenance flag: {}", e);
                false
            }
        }
    }

    pub async fn set(&self, enabled: bool) -> Result<(), StoreError> {
        let value = encode_record(MAINTENANCE_KEY, &MaintenanceRecord { enabled })?;
        bounded(self.timeout, self.store.put(MAINTENANCE_KEY, &value)).await?;
        info!("🔧 Maintenance mode {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }
}
