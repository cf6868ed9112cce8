//! Fan-out/fan-in of enrichment tasks for one source's batch.
//!
//! The collector spawns one task per linked raw item and gathers the
//! finished items from a channel until every task has reported or the
//! deadline passes, whichever comes first. A deadline hit is not an error:
//! whatever arrived so far is the result.
//!
//! The channel has room for every task's item, so a task that finishes
//! after the collector stopped listening never blocks. Tasks still running
//! when collection ends are aborted.

use crate::enrich::Enrich;
use crate::models::{Item, RawItem, sort_items};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

/// Runs one batch of enrichment tasks under a wall-clock deadline.
///
/// A collector is shared by every source that uses the same enricher; each
/// [`collect`](Collector::collect) call is independent.
pub struct Collector {
    enricher: Arc<dyn Enrich>,
    deadline: Duration,
    max_in_flight: Option<usize>,
}

impl Collector {
    /// Create a collector that gives each batch `deadline` to finish, with
    /// no cap on concurrent tasks.
    pub fn new(enricher: Arc<dyn Enrich>, deadline: Duration) -> Self {
        Self {
            enricher,
            deadline,
            max_in_flight: None,
        }
    }

    /// Cap the number of enrichment tasks doing work at once. Tasks over the
    /// cap wait for a permit; the deadline still applies to the whole batch.
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight.filter(|&n| n > 0);
        self
    }

    /// Enrich every linked raw item concurrently and return the items that
    /// finished before the deadline, most recent first.
    ///
    /// Raw items without a link are ignored.
    #[instrument(level = "info", skip_all, fields(deadline = ?self.deadline))]
    pub async fn collect(&self, raw_items: Vec<RawItem>) -> Vec<Item> {
        let eligible: Vec<RawItem> = raw_items.into_iter().filter(RawItem::has_link).collect();
        let expected = eligible.len();
        if expected == 0 {
            debug!("No linked items to enrich");
            return Vec::new();
        }

        let (tx, mut rx) = mpsc::channel::<Item>(expected);
        let limiter = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();

        for raw in eligible {
            let tx = tx.clone();
            let enricher = Arc::clone(&self.enricher);
            let limiter = limiter.clone();
            let span = info_span!("enrich_task", id = %raw.id);
            tasks.spawn(
                async move {
                    let _permit = match limiter {
                        Some(limiter) => match limiter.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => return,
                        },
                        None => None,
                    };
                    let item = enricher.enrich(raw).await;
                    if tx.try_send(item).is_err() {
                        debug!("Collector stopped listening; dropping item");
                    }
                }
                .instrument(span),
            );
        }
        drop(tx);

        let mut items = Vec::with_capacity(expected);
        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        while items.len() < expected {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(item) => items.push(item),
                    None => {
                        warn!(
                            received = items.len(),
                            expected,
                            "Some enrichment tasks ended without producing an item"
                        );
                        break;
                    }
                },
                _ = &mut deadline => {
                    warn!(
                        received = items.len(),
                        expected,
                        "timed out getting information about items"
                    );
                    break;
                }
            }
        }
        tasks.abort_all();

        sort_items(&mut items);
        info!(count = items.len(), expected, "Collected enriched items");
        items
    }
}
