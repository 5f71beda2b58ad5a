//! Background removal of expired pending registrations.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use noteshare_core::db::{DatabaseError, unix_timestamp};

use crate::storage::NoteshareDatabase;

/// Delete pending rows that expired at or before `now`.
pub async fn sweep_once(db: &NoteshareDatabase, now: i64) -> Result<u64, DatabaseError> {
    let removed = db.sweep_expired_pending(now).await?;
    if removed > 0 {
        info!(removed, "Expired pending registrations removed");
    } else {
        debug!("No expired pending registrations");
    }
    Ok(removed)
}

/// Run [`sweep_once`] every `period` until the runtime shuts down.
pub fn spawn_pending_sweep(db: NoteshareDatabase, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            if let Err(e) = sweep_once(&db, unix_timestamp()).await {
                warn!(error = %e, "Pending registration sweep failed");
            }
        }
    })
}
