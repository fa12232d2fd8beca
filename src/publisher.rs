//! Producer side: paced publication of labeled items.

use crate::error::Result;
use crate::model::WorkItem;
use crate::queue::LeaseQueue;
use crate::store::Store;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

/// Label of the `index`-th generated item.
pub fn item_label(index: usize) -> String {
    format!("WorkItem-{index}")
}

/// Publish `WorkItem-1` through `WorkItem-{count - 1}`, one per `every`.
///
/// The first item goes out immediately. Returns the number of items published.
pub async fn publish_sequence<S: Store>(
    queue: &LeaseQueue<S>,
    count: usize,
    every: Duration,
) -> Result<usize> {
    let mut published = 0;
    if count < 2 {
        return Ok(published);
    }

    let mut ticker = interval(every.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for index in 1..count {
        ticker.tick().await;
        let item = WorkItem::from(item_label(index));
        let len = queue.publish(&item).await?;
        info!(queue = %queue.name(), %item, len, "publishing");
        published += 1;
    }
    Ok(published)
}
