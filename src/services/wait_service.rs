use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::services::collection_service::CollectionService;
use crate::services::event_service::PipelineEvent;
use crate::utils::time::now;

/// Publishes a `WaitTick` every `period` while at least one candidate is
/// checked in, so views can redraw wait times. Quiet otherwise.
pub fn spawn_wait_ticker(collections: CollectionService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let checked_in = collections.checked_in_count().await;
            if checked_in == 0 {
                continue;
            }
            debug!(checked_in, "Wait tick");
            collections.events().publish(PipelineEvent::WaitTick {
                at: now(),
                checked_in,
            });
        }
    })
}
