// ── Favorite projection ──
//
// The UI's view of which sites are favorites. Optimistic edits land here
// immediately; authoritative lists from the backend replace it wholesale.
// Rebuilds carry a generation so a slow, older response can never
// overwrite a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::model::{FavoriteRecord, Site, SiteKey, SyncQueueItem};

pub type FavoriteSnapshot = Arc<HashMap<SiteKey, Site>>;

pub struct FavoriteProjection {
    /// Generation of the last rebuild that was applied.
    applied: Mutex<u64>,
    /// Last generation handed out by [`begin`](Self::begin).
    issued: AtomicU64,
    snapshot: watch::Sender<FavoriteSnapshot>,
}

impl FavoriteProjection {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(HashMap::new()));
        Self {
            applied: Mutex::new(0),
            issued: AtomicU64::new(0),
            snapshot,
        }
    }

    pub fn contains(&self, key: &SiteKey) -> bool {
        self.snapshot.borrow().contains_key(key)
    }

    /// Current favorites (cheap `Arc` clone).
    pub fn snapshot(&self) -> FavoriteSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoriteSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    /// Claim a generation for a backend request about to be issued.
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a single intent on top of the current state.
    pub fn apply_optimistic(&self, item: &SyncQueueItem) {
        let _applied = crate::sync::locked(&self.applied);
        self.snapshot
            .send_modify(|snap| apply_intent(Arc::make_mut(snap), item));
    }

    /// Replace the projection with `records`, then replay `pending` intents
    /// that the backend has not seen yet.
    ///
    /// Returns `false` (and changes nothing) if a rebuild from a later
    /// generation has already been applied.
    pub fn apply_authoritative(
        &self,
        generation: u64,
        records: &[FavoriteRecord],
        pending: &[SyncQueueItem],
    ) -> bool {
        let mut applied = crate::sync::locked(&self.applied);
        if generation <= *applied {
            debug!(generation, applied = *applied, "discarding stale favorites rebuild");
            return false;
        }
        *applied = generation;

        let mut map: HashMap<SiteKey, Site> = records
            .iter()
            .map(|r| (r.key.clone(), r.site.clone()))
            .collect();
        for item in pending {
            apply_intent(&mut map, item);
        }
        debug!(generation, favorites = map.len(), "favorites projection rebuilt");
        self.snapshot.send_modify(|snap| *snap = Arc::new(map));
        true
    }
}

impl Default for FavoriteProjection {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_intent(map: &mut HashMap<SiteKey, Site>, item: &SyncQueueItem) {
    match item {
        SyncQueueItem::Add(site) => {
            map.insert(site.key(), site.clone());
        }
        SyncQueueItem::Remove(site) => {
            map.remove(&site.key());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> FavoriteRecord {
        let site = Site::new(name, 1.0, 2.0);
        FavoriteRecord {
            key: site.key(),
            site,
        }
    }

    #[test]
    fn optimistic_add_and_remove() {
        let projection = FavoriteProjection::new();
        let site = Site::new("A", 1.0, 2.0);

        projection.apply_optimistic(&SyncQueueItem::Add(site.clone()));
        assert!(projection.contains(&site.key()));

        projection.apply_optimistic(&SyncQueueItem::Remove(site.clone()));
        assert!(!projection.contains(&site.key()));
    }

    #[test]
    fn older_generation_is_discarded() {
        let projection = FavoriteProjection::new();
        let first = projection.begin();
        let second = projection.begin();

        assert!(projection.apply_authoritative(second, &[record("new")], &[]));
        assert!(!projection.apply_authoritative(first, &[record("old")], &[]));

        assert!(projection.contains(&record("new").key));
        assert!(!projection.contains(&record("old").key));
    }

    #[test]
    fn pending_intents_survive_rebuild() {
        let projection = FavoriteProjection::new();
        let pending = Site::new("pending", 3.0, 4.0);
        let generation = projection.begin();

        projection.apply_authoritative(
            generation,
            &[record("A"), record("B")],
            &[
                SyncQueueItem::Add(pending.clone()),
                SyncQueueItem::Remove(record("B").site),
            ],
        );

        assert!(projection.contains(&record("A").key));
        assert!(!projection.contains(&record("B").key));
        assert!(projection.contains(&pending.key()));
        assert_eq!(projection.len(), 2);
    }

    #[test]
    fn subscribers_see_rebuilds() {
        let projection = FavoriteProjection::new();
        let rx = projection.subscribe();
        let generation = projection.begin();
        projection.apply_authoritative(generation, &[record("A")], &[]);
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow().len(), 1);
    }
}
