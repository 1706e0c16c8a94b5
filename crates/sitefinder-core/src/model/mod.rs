// ── Domain model ──
//
// Engine-facing types. Wire shapes live in `sitefinder-api` and are
// converted in `convert.rs`.

pub mod coordinate;
pub mod favorite;
pub mod radius;
pub mod route;
pub mod site;

pub use coordinate::Coordinate;
pub use favorite::{FavoriteRecord, SyncQueueItem};
pub use radius::{DEFAULT_RADIUS_INDEX, DEFAULT_RADIUS_OPTIONS_KM, RadiusSetting, radius_label};
pub use route::{RouteNotice, RouteResult, RouteSummary};
pub use site::{Site, SiteKey};
