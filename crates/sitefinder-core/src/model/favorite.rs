use serde::{Deserialize, Serialize};

use super::{Site, SiteKey};

/// A favorite as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub key: SiteKey,
    pub site: Site,
}

/// One pending favorite intent.
///
/// The queue keeps every intent in the order it was made; collapsing to
/// the last intent per key only happens when a batch is built.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncQueueItem {
    Add(Site),
    Remove(Site),
}

impl SyncQueueItem {
    pub fn new(site: Site, is_adding: bool) -> Self {
        if is_adding {
            Self::Add(site)
        } else {
            Self::Remove(site)
        }
    }

    pub fn site(&self) -> &Site {
        match self {
            Self::Add(site) | Self::Remove(site) => site,
        }
    }

    pub fn key(&self) -> SiteKey {
        self.site().key()
    }

    pub fn is_adding(&self) -> bool {
        matches!(self, Self::Add(_))
    }
}
