//! Daily boundary refresh
//!
//! Due and overdue depend on today's date, so subscribers must re-read when
//! the local date rolls over even if nothing was written. This task sleeps
//! until the next local midnight and then refreshes every coordinator.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::{Clock, LocalZone};
use crate::coordinator::{RefreshReason, WateringCoordinator};

/// Time left until the next local midnight
///
/// Never zero: at exactly midnight the next boundary is a day away.
pub fn duration_until_next_midnight(now: DateTime<Utc>, zone: &LocalZone) -> Duration {
    let next = zone.next_midnight(now);
    (next - now)
        .to_std()
        .unwrap_or(Duration::from_secs(1))
        .max(Duration::from_secs(1))
}

/// Refresh every coordinator at each local midnight, forever
pub async fn run_daily_refresh(
    coordinators: Vec<Arc<WateringCoordinator>>,
    clock: Arc<dyn Clock>,
    zone: LocalZone,
) {
    loop {
        let wait = duration_until_next_midnight(clock.now(), &zone);
        debug!(seconds = wait.as_secs(), "sleeping until next local midnight");
        tokio::time::sleep(wait).await;

        info!(plants = coordinators.len(), "local date changed, refreshing");
        for coordinator in &coordinators {
            coordinator.refresh(RefreshReason::DayChanged);
        }
    }
}

/// Spawn [`run_daily_refresh`] on the current tokio runtime
pub fn spawn_daily_refresh(
    coordinators: Vec<Arc<WateringCoordinator>>,
    clock: Arc<dyn Clock>,
    zone: LocalZone,
) -> JoinHandle<()> {
    tokio::spawn(run_daily_refresh(coordinators, clock, zone))
}
