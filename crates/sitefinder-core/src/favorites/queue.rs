// ── Debounced favorite sync queue ──
//
// Toggles are recorded as literal intents and applied to the projection
// right away. A single debounce timer (restarted on every enqueue) flushes
// them as one batch. At most one batch is in flight: the submit lock is
// taken before the snapshot is claimed, so a second flush waits for the
// first to settle. A failed batch goes back to the front of the queue,
// ahead of anything enqueued while it was in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::projection::FavoriteProjection;
use super::{Connectivity, FavoritesBackend};
use crate::error::CoreError;
use crate::model::{FavoriteRecord, Site, SiteKey, SyncQueueItem};

/// What a call to [`FavoriteSyncQueue::flush`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued.
    Empty,
    /// The backend looked unreachable; intents stay queued.
    Offline { queued: usize },
    /// One batch was accepted.
    Submitted {
        adds: usize,
        removes: usize,
        favorites: usize,
    },
}

pub struct FavoriteSyncQueue<B, C> {
    inner: Arc<QueueInner<B, C>>,
}

struct QueueInner<B, C> {
    backend: Arc<B>,
    connectivity: Arc<C>,
    projection: Arc<FavoriteProjection>,
    pending: Mutex<VecDeque<SyncQueueItem>>,
    submit: tokio::sync::Mutex<()>,
    debounce: Duration,
    /// Bumped on every enqueue; a timer only fires if its epoch is current.
    epoch: AtomicU64,
    cancel: CancellationToken,
}

impl<B, C> Clone for FavoriteSyncQueue<B, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: FavoritesBackend, C: Connectivity> FavoriteSyncQueue<B, C> {
    pub fn new(
        backend: Arc<B>,
        connectivity: Arc<C>,
        projection: Arc<FavoriteProjection>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                backend,
                connectivity,
                projection,
                pending: Mutex::new(VecDeque::new()),
                submit: tokio::sync::Mutex::new(()),
                debounce,
                epoch: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn projection(&self) -> &Arc<FavoriteProjection> {
        &self.inner.projection
    }

    /// Record an intent, apply it optimistically, and restart the debounce
    /// timer. Must be called from within a Tokio runtime.
    pub fn enqueue(&self, site: Site, is_adding: bool) {
        let item = SyncQueueItem::new(site, is_adding);
        let key = item.key();
        let queued = {
            let mut pending = self.lock_pending();
            self.inner.projection.apply_optimistic(&item);
            pending.push_back(item);
            pending.len()
        };
        debug!(%key, is_adding, queued, "favorite intent queued");
        self.schedule_flush();
    }

    /// Intents not yet accepted by the backend, oldest first.
    pub fn pending(&self) -> Vec<SyncQueueItem> {
        self.lock_pending().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_pending().is_empty()
    }

    /// Submit everything queued as one batch.
    ///
    /// On failure the claimed intents are put back ahead of newer ones and
    /// the error is returned.
    pub async fn flush(&self) -> Result<FlushOutcome, CoreError> {
        let _submitting = self.inner.submit.lock().await;

        if self.is_empty() {
            return Ok(FlushOutcome::Empty);
        }
        if !self.inner.connectivity.is_online().await {
            let queued = self.len();
            info!(queued, "offline, favorites flush skipped");
            return Ok(FlushOutcome::Offline { queued });
        }

        let snapshot: Vec<SyncQueueItem> = self.lock_pending().drain(..).collect();
        if snapshot.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        let (adds, removes) = collapse_intents(&snapshot);
        let (add_count, remove_count) = (adds.len(), removes.len());
        let generation = self.inner.projection.begin();
        debug!(
            intents = snapshot.len(),
            adds = add_count,
            removes = remove_count,
            generation,
            "submitting favorites batch"
        );

        match self.inner.backend.submit_batch(adds, removes).await {
            Ok(records) => {
                self.rebuild(generation, &records);
                info!(favorites = records.len(), "favorites batch synced");
                Ok(FlushOutcome::Submitted {
                    adds: add_count,
                    removes: remove_count,
                    favorites: records.len(),
                })
            }
            Err(e) => {
                let mut pending = self.lock_pending();
                for item in snapshot.into_iter().rev() {
                    pending.push_front(item);
                }
                warn!(error = %e, queued = pending.len(), "favorites batch failed, intents re-queued");
                Err(e)
            }
        }
    }

    /// Immediately add or remove `target` depending on whether `current`
    /// holds it, bypassing the queue. Returns whether the site is a
    /// favorite afterwards.
    pub async fn toggle_favorite(
        &self,
        target: Site,
        current: &HashMap<SiteKey, Site>,
    ) -> Result<bool, CoreError> {
        let key = target.key();
        let (adds, removes) = if current.contains_key(&key) {
            (Vec::new(), vec![target])
        } else {
            (vec![target], Vec::new())
        };

        let _submitting = self.inner.submit.lock().await;
        let generation = self.inner.projection.begin();
        debug!(%key, adding = !adds.is_empty(), "toggling favorite");
        let records = self.inner.backend.submit_batch(adds, removes).await?;
        self.rebuild(generation, &records);
        Ok(records.iter().any(|r| r.key == key))
    }

    /// Fetch the authoritative list and rebuild the projection. Returns
    /// the number of favorites.
    ///
    /// Waits for any batch in flight, so the list it fetches already
    /// reflects that batch.
    pub async fn refresh(&self) -> Result<usize, CoreError> {
        let _submitting = self.inner.submit.lock().await;
        let generation = self.inner.projection.begin();
        let records = self.inner.backend.list().await?;
        self.rebuild(generation, &records);
        debug!(favorites = records.len(), generation, "favorites refreshed");
        Ok(records.len())
    }

    /// Cancel any pending debounce timer. Queued intents stay inspectable
    /// and can still be flushed by hand.
    pub fn dispose(&self) {
        self.inner.cancel.cancel();
        debug!(queued = self.len(), "favorite sync queue disposed");
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock_pending(&self) -> MutexGuard<'_, VecDeque<SyncQueueItem>> {
        crate::sync::locked(&self.inner.pending)
    }

    /// Apply `records` under the queue lock so intents enqueued during the
    /// request are replayed on top.
    fn rebuild(&self, generation: u64, records: &[FavoriteRecord]) {
        let pending = self.lock_pending();
        let overlay: Vec<SyncQueueItem> = pending.iter().cloned().collect();
        self.inner
            .projection
            .apply_authoritative(generation, records, &overlay);
    }

    fn schedule_flush(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let queue = self.clone();
        let cancel = self.inner.cancel.clone();
        let delay = self.inner.debounce;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            if queue.inner.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            match queue.flush().await {
                Ok(outcome) => debug!(?outcome, "debounced favorites flush finished"),
                Err(e) => warn!(error = %e, "debounced favorites flush failed"),
            }
        });
    }
}

/// Split intents into adds and removes, keeping only the last intent per
/// key. Order follows each key's last occurrence.
fn collapse_intents(items: &[SyncQueueItem]) -> (Vec<Site>, Vec<Site>) {
    let mut last: HashMap<SiteKey, usize> = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        last.insert(item.key(), i);
    }

    let mut adds = Vec::new();
    let mut removes = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if last.get(&item.key()) != Some(&i) {
            continue;
        }
        match item {
            SyncQueueItem::Add(site) => adds.push(site.clone()),
            SyncQueueItem::Remove(site) => removes.push(site.clone()),
        }
    }
    (adds, removes)
}
