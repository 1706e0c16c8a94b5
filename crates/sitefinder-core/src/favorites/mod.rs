//! Favorite synchronization.
//!
//! - [`FavoriteSyncQueue`] batches toggles behind a debounce, skips flushes
//!   while offline, and re-queues a failed batch ahead of newer intents.
//! - [`FavoriteProjection`] is the optimistic local view the UI reads.
//! - [`FavoritesBackend`] and [`Connectivity`] are the seams to the remote
//!   service; `FavoritesClient` implements both.

mod projection;
mod queue;

use std::future::Future;

use sitefinder_api::{BatchRequest, FavoritesClient, TransportConfig, WireSite};
use tracing::debug;

use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{FavoriteRecord, Site};

pub use projection::{FavoriteProjection, FavoriteSnapshot};
pub use queue::{FavoriteSyncQueue, FlushOutcome};

/// Remote store of favorites.
pub trait FavoritesBackend: Send + Sync + 'static {
    /// Every favorite the backend holds for the current user.
    fn list(&self) -> impl Future<Output = Result<Vec<FavoriteRecord>, CoreError>> + Send;

    /// Apply adds and removes in one request and return the resulting list.
    fn submit_batch(
        &self,
        adds: Vec<Site>,
        removes: Vec<Site>,
    ) -> impl Future<Output = Result<Vec<FavoriteRecord>, CoreError>> + Send;
}

/// Answers "is it worth trying the network right now?".
pub trait Connectivity: Send + Sync + 'static {
    fn is_online(&self) -> impl Future<Output = bool> + Send;
}

/// [`Connectivity`] that never reports offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

/// Build the favorites client described by `config`.
pub fn client_from_config(config: &ControllerConfig) -> Result<FavoritesClient, CoreError> {
    let transport = TransportConfig {
        tls: config.tls.clone(),
        timeout: config.timeout,
    };
    Ok(FavoritesClient::new(
        config.api_url.clone(),
        &config.api_token,
        &transport,
    )?)
}

impl FavoritesBackend for FavoritesClient {
    async fn list(&self) -> Result<Vec<FavoriteRecord>, CoreError> {
        let items = self.list_favorites().await?;
        Ok(items.into_iter().map(FavoriteRecord::from).collect())
    }

    async fn submit_batch(
        &self,
        adds: Vec<Site>,
        removes: Vec<Site>,
    ) -> Result<Vec<FavoriteRecord>, CoreError> {
        let request = BatchRequest {
            adds: adds.iter().map(WireSite::from).collect(),
            removes: removes.iter().map(WireSite::from).collect(),
        };
        let items = self.batch(&request).await?;
        Ok(items.into_iter().map(FavoriteRecord::from).collect())
    }
}

impl Connectivity for FavoritesClient {
    async fn is_online(&self) -> bool {
        match self.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "favorites backend unreachable");
                false
            }
        }
    }
}
