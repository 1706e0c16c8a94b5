//! Location-aware site finder engine, between `sitefinder-api` and a host
//! UI with an embedded map renderer.
//!
//! - **[`Controller`]** -- Central facade. Feeds position fixes through the
//!   [`LocationTracker`], drives the [`PanelStateMachine`], asks the
//!   [`RouteProvider`] for walking routes (and reroutes as the user moves),
//!   and pushes every visible change to the renderer over the [`MapBridge`].
//!
//! - **[`FavoriteSyncQueue`]** -- Debounced, offline-aware favorite sync with
//!   optimistic updates. Failed batches are re-queued in order; rebuilds of
//!   the [`FavoriteProjection`] are generation-checked.
//!
//! - **Geometry** ([`geo`], [`filter`]) -- Haversine distance and radius
//!   filtering over the static [`SiteCatalog`].
//!
//! - **Renderer protocol** ([`bridge`]) -- Closed, `type`-tagged JSON message
//!   sets in both directions with strict inbound decoding.
//!
//! - **Domain model** ([`model`]) -- [`Site`] with its canonical [`SiteKey`],
//!   [`Coordinate`], [`RadiusSetting`], and [`RouteResult`].

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod geo;
pub mod model;
pub mod panel;
pub mod route;
mod sync;
pub mod tracker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{BridgeError, InboundMessage, MapBridge, OutboundMessage, RendererModel};
pub use catalog::SiteCatalog;
pub use config::{ControllerConfig, TlsMode};
pub use controller::{Controller, RouteOutcome, UiEvent};
pub use error::CoreError;
pub use favorites::{
    AlwaysOnline, Connectivity, FavoriteProjection, FavoriteSnapshot, FavoriteSyncQueue,
    FavoritesBackend, FlushOutcome,
};
pub use panel::{PanelEffect, PanelState, PanelStateMachine};
pub use route::{DirectionsRouteProvider, RouteProvider};
pub use tracker::{LocationTracker, PositionEvent, PositionUpdate};

pub use model::{
    Coordinate, FavoriteRecord, RadiusSetting, RouteNotice, RouteResult, RouteSummary, Site,
    SiteKey, SyncQueueItem, radius_label,
};
