pub mod aggregator;
pub mod collector;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::folio::cache::{ActivitySnapshot, SnapshotStore};
use crate::folio::types::{ActivityRecord, IntensityRecord};

pub use aggregator::{Aggregator, days_in_month, is_leap_year};
pub use collector::{ActivitySource, Collection, MAX_IN_FLIGHT, Throttled, collect};

/// Serves the activity heatmap, collecting from `source` only when the
/// stored snapshot is stale or a refresh is forced.
pub struct ActivityService<S> {
    source: S,
    store: SnapshotStore,
    aggregator: Aggregator,
}

impl<S: ActivitySource> ActivityService<S> {
    pub fn new(source: S, store: SnapshotStore, aggregator: Aggregator) -> Self {
        Self {
            source,
            store,
            aggregator,
        }
    }

    /// Raw records, from the snapshot when it is still fresh.
    ///
    /// A failed collection falls back to whatever snapshot exists, or to no
    /// records at all.
    pub async fn records(&self, force: bool, now: DateTime<Utc>) -> Vec<ActivityRecord> {
        let cached = match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("ignoring unreadable activity snapshot: {err:#}");
                None
            }
        };

        if let Some(snapshot) = &cached {
            if !snapshot.needs_refresh(now, force) {
                return snapshot.dates.clone();
            }
        }

        let skip = cached
            .as_ref()
            .map(|snapshot| snapshot.bad_repos.clone())
            .unwrap_or_default();

        match collect(&self.source, &skip).await {
            Ok(collection) => {
                info!(
                    "collected {} activity record(s), {} repositories skipped",
                    collection.dates.len(),
                    collection.bad_repos.len()
                );
                let snapshot = ActivitySnapshot {
                    last_fetched: now,
                    dates: collection.dates,
                    bad_repos: collection.bad_repos,
                };
                if let Err(err) = self.store.save(&snapshot) {
                    warn!("activity snapshot not saved: {err:#}");
                }
                snapshot.dates
            }
            Err(err) => {
                warn!("activity collection failed, serving cached records: {err:#}");
                cached.map(|snapshot| snapshot.dates).unwrap_or_default()
            }
        }
    }

    pub async fn intensities(&self, force: bool, now: DateTime<Utc>) -> Vec<IntensityRecord> {
        let records = self.records(force, now).await;
        self.aggregator.aggregate(&records)
    }
}
