// ── Controller ──
//
// Wires the tracker, panel state machine, route provider, favorite queue,
// and map bridge together. Business state lives behind one short-lived
// lock that is never held across an await; route responses carry a
// ticket so anything that changed the panel while they were in flight
// wins.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_core::Stream;
use futures_util::StreamExt;
use sitefinder_api::FavoritesClient;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{InboundMessage, MapBridge, OutboundMessage};
use crate::catalog::SiteCatalog;
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::favorites::{
    self, Connectivity, FavoriteProjection, FavoriteSnapshot, FavoriteSyncQueue, FavoritesBackend,
    FlushOutcome,
};
use crate::model::{Coordinate, RadiusSetting, RouteNotice, RouteResult, Site, SyncQueueItem};
use crate::panel::{PanelEffect, PanelState, PanelStateMachine};
use crate::route::{DirectionsRouteProvider, RouteProvider};
use crate::tracker::{LocationTracker, PositionEvent};

const EVENT_CHANNEL_SIZE: usize = 64;

// ── Public types ─────────────────────────────────────────────────

/// Things the host UI reacts to that are not renderer messages.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    PanelOpened(Site),
    PanelClosed,
    Notice(RouteNotice),
    NearbyUpdated { count: usize, radius_km: f64 },
    NearbyUnavailable,
}

/// Result of [`Controller::start_route`].
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Routed(RouteResult),
    NoPath,
    /// The provider could not be reached; the user was told to retry.
    Failed { reason: String },
    /// The panel changed while the request was in flight; the response was
    /// dropped.
    Superseded,
}

// ── Controller ───────────────────────────────────────────────────

/// Engine facade. Cheaply cloneable via `Arc<ControllerInner>`.
pub struct Controller<R = DirectionsRouteProvider, B = FavoritesClient, C = FavoritesClient> {
    inner: Arc<ControllerInner<R, B, C>>,
}

impl<R, B, C> Clone for Controller<R, B, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<R, B, C> {
    catalog: SiteCatalog,
    routes: R,
    bridge: MapBridge,
    renderer_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    favorites: FavoriteSyncQueue<B, C>,
    session: Mutex<Session>,
    events: broadcast::Sender<UiEvent>,
    cancel: CancellationToken,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

struct Session {
    tracker: LocationTracker,
    panel: PanelStateMachine,
    route_requests: u64,
}

/// Identifies one route request against the panel state it was made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RouteTicket {
    panel: u64,
    request: u64,
}

impl Session {
    fn issue_ticket(&mut self) -> RouteTicket {
        self.route_requests += 1;
        RouteTicket {
            panel: self.panel.generation(),
            request: self.route_requests,
        }
    }

    fn is_current(&self, ticket: RouteTicket) -> bool {
        ticket.panel == self.panel.generation() && ticket.request == self.route_requests
    }
}

impl Controller {
    /// Build a controller that talks to the real favorites backend and
    /// directions service.
    pub fn from_config(config: &ControllerConfig, catalog: SiteCatalog) -> Result<Self, CoreError> {
        let routes = DirectionsRouteProvider::from_config(config)?;
        let client = Arc::new(favorites::client_from_config(config)?);
        Self::new(config, catalog, routes, Arc::clone(&client), client)
    }
}

impl<R, B, C> Controller<R, B, C>
where
    R: RouteProvider,
    B: FavoritesBackend,
    C: Connectivity,
{
    pub fn new(
        config: &ControllerConfig,
        catalog: SiteCatalog,
        routes: R,
        backend: Arc<B>,
        connectivity: Arc<C>,
    ) -> Result<Self, CoreError> {
        let radius = RadiusSetting::new(
            config.radius_options_km.clone(),
            config.initial_radius_index,
        )?;
        let (bridge, renderer_rx) = MapBridge::channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let favorites = FavoriteSyncQueue::new(
            backend,
            connectivity,
            Arc::new(FavoriteProjection::new()),
            config.favorite_debounce,
        );

        Ok(Self {
            inner: Arc::new(ControllerInner {
                catalog,
                routes,
                bridge,
                renderer_rx: Mutex::new(Some(renderer_rx)),
                favorites,
                session: Mutex::new(Session {
                    tracker: LocationTracker::new(radius, config.reroute_threshold_km),
                    panel: PanelStateMachine::new(),
                    route_requests: 0,
                }),
                events,
                cancel: CancellationToken::new(),
                task_handles: tokio::sync::Mutex::new(Vec::new()),
            }),
        })
    }

    // ── Position handling ────────────────────────────────────────

    /// Feed one position fix: recompute nearby sites, refresh the map, and
    /// reroute if the user has walked far enough from the route origin.
    pub async fn handle_position(&self, position: Coordinate) -> Result<(), CoreError> {
        let (update, reroute, radius_km) = {
            let mut s = self.session();
            let routing = s.panel.is_routing();
            let update = s
                .tracker
                .observe(position, self.inner.catalog.sites(), routing);
            let reroute = if update.reroute {
                let destination = s.panel.site().map(Site::coordinate);
                // Anchor on the attempt: a failed reroute is retried only
                // after another threshold's worth of walking.
                s.tracker.anchor_route(position);
                destination.map(|d| (d, s.issue_ticket()))
            } else {
                None
            };
            (update, reroute, s.tracker.radius().km())
        };

        debug!(%position, nearby = update.nearby.len(), "position fix");
        let count = update.nearby.len();
        self.inner
            .bridge
            .send(&OutboundMessage::location_update(position, update.nearby))?;
        self.emit(UiEvent::NearbyUpdated { count, radius_km });

        if let Some((destination, ticket)) = reroute {
            self.reroute(position, destination, ticket).await?;
        }
        Ok(())
    }

    /// The position source reported a permission denial.
    pub fn handle_permission_denied(&self) {
        self.session().tracker.mark_permission_denied();
        warn!("location permission denied, nearby search unavailable");
        self.emit(UiEvent::NearbyUnavailable);
    }

    async fn reroute(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        ticket: RouteTicket,
    ) -> Result<(), CoreError> {
        match self.inner.routes.route(origin, destination).await {
            Ok(Some(route)) => {
                let effects = {
                    let mut s = self.session();
                    if !s.is_current(ticket) {
                        debug!("discarding stale reroute");
                        return Ok(());
                    }
                    s.panel.reroute(route)?
                };
                info!(%origin, "rerouted");
                self.apply(effects)
            }
            Ok(None) => {
                info!(%origin, "no route from new position, keeping previous route");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "reroute failed, keeping previous route");
                Ok(())
            }
        }
    }

    // ── Radius ───────────────────────────────────────────────────

    pub fn set_radius_index(&self, index: usize) -> Result<(), CoreError> {
        self.session().tracker.set_radius_index(index)?;
        self.push_nearby()
    }

    /// Step the radius up one option. `Ok(false)` at the top.
    pub fn increase_radius(&self) -> Result<bool, CoreError> {
        let changed = self.session().tracker.increase_radius();
        if changed {
            self.push_nearby()?;
        }
        Ok(changed)
    }

    /// Step the radius down one option. `Ok(false)` at the bottom.
    pub fn decrease_radius(&self) -> Result<bool, CoreError> {
        let changed = self.session().tracker.decrease_radius();
        if changed {
            self.push_nearby()?;
        }
        Ok(changed)
    }

    fn push_nearby(&self) -> Result<(), CoreError> {
        let (update, radius_km) = {
            let s = self.session();
            let update = s.tracker.last_position().zip(s.tracker.nearby(self.inner.catalog.sites()));
            (update, s.tracker.radius().km())
        };
        let Some((position, nearby)) = update else {
            return Ok(());
        };
        let count = nearby.len();
        self.inner
            .bridge
            .send(&OutboundMessage::location_update(position, nearby))?;
        self.emit(UiEvent::NearbyUpdated { count, radius_km });
        Ok(())
    }

    // ── Renderer input and panel ─────────────────────────────────

    /// Decode and act on one raw message from the renderer.
    pub fn handle_renderer_message(&self, raw: &str) -> Result<(), CoreError> {
        let msg = InboundMessage::decode(raw).inspect_err(|e| {
            warn!(error = %e, "rejected renderer message");
        })?;
        match msg {
            InboundMessage::MarkerClick { payload } => self.select_site(payload),
        }
    }

    /// Open the detail panel for `site`, abandoning any active route.
    pub fn select_site(&self, site: Site) -> Result<(), CoreError> {
        let effects = {
            let mut s = self.session();
            if s.panel.is_routing() {
                s.tracker.clear_route_anchor();
            }
            s.panel.marker_click(site)
        };
        self.apply(effects)
    }

    /// Request a walking route from the current position to the selected
    /// site.
    pub async fn start_route(&self) -> Result<RouteOutcome, CoreError> {
        let (origin, destination, ticket) = {
            let mut s = self.session();
            let PanelState::Selected(site) = s.panel.state() else {
                return Err(CoreError::InvalidTransition {
                    action: "start a route",
                    state: s.panel.state().name(),
                });
            };
            let destination = site.coordinate();
            if !s.tracker.is_available() {
                return Err(CoreError::PermissionDenied);
            }
            let origin = s
                .tracker
                .last_position()
                .ok_or(CoreError::PositionUnavailable)?;
            (origin, destination, s.issue_ticket())
        };

        debug!(%origin, %destination, "requesting route");
        let result = self.inner.routes.route(origin, destination).await;

        let (effects, outcome) = {
            let mut s = self.session();
            if !s.is_current(ticket) {
                debug!("discarding stale route response");
                return Ok(RouteOutcome::Superseded);
            }
            match result {
                Ok(Some(route)) => {
                    s.tracker.anchor_route(origin);
                    let summary = route.summary();
                    info!(distance = %summary.distance, duration = %summary.duration, "route found");
                    (
                        s.panel.route_found(route.clone())?,
                        RouteOutcome::Routed(route),
                    )
                }
                Ok(None) => (
                    s.panel.route_unavailable(RouteNotice::NoPath)?,
                    RouteOutcome::NoPath,
                ),
                Err(e) => {
                    warn!(error = %e, "route request failed");
                    (
                        s.panel.route_unavailable(RouteNotice::TryAgain)?,
                        RouteOutcome::Failed {
                            reason: e.to_string(),
                        },
                    )
                }
            }
        };
        self.apply(effects)?;
        Ok(outcome)
    }

    /// Leave routing and clear the polyline.
    pub fn cancel_route(&self) -> Result<(), CoreError> {
        let effects = {
            let mut s = self.session();
            let effects = s.panel.cancel()?;
            s.tracker.clear_route_anchor();
            effects
        };
        self.apply(effects)
    }

    pub fn close_panel(&self) -> Result<(), CoreError> {
        let effects = self.session().panel.close()?;
        self.apply(effects)
    }

    /// Pan the map to the user. Returns `false` before the first fix.
    pub fn center_on_user(&self) -> Result<bool, CoreError> {
        let position = {
            let s = self.session();
            if !s.tracker.is_available() {
                return Err(CoreError::PermissionDenied);
            }
            s.tracker.last_position()
        };
        let Some(position) = position else {
            return Ok(false);
        };
        self.inner.bridge.send(&OutboundMessage::center(position))?;
        Ok(true)
    }

    // ── Favorites ────────────────────────────────────────────────

    /// Flip `site`'s favorite state optimistically and queue the change.
    /// Returns the new state.
    pub fn toggle_favorite(&self, site: Site) -> Result<bool, CoreError> {
        let key = site.key();
        let is_fav = !self.inner.favorites.projection().contains(&key);
        self.inner.favorites.enqueue(site, is_fav);
        self.inner
            .bridge
            .send(&OutboundMessage::FavoriteToggled { key, is_fav })?;
        Ok(is_fav)
    }

    pub fn is_favorite(&self, site: &Site) -> bool {
        self.inner.favorites.projection().contains(&site.key())
    }

    pub fn favorites_snapshot(&self) -> FavoriteSnapshot {
        self.inner.favorites.projection().snapshot()
    }

    /// Stream of favorite snapshots, starting with the current one.
    pub fn favorites(&self) -> WatchStream<FavoriteSnapshot> {
        WatchStream::new(self.inner.favorites.projection().subscribe())
    }

    pub fn pending_favorites(&self) -> Vec<SyncQueueItem> {
        self.inner.favorites.pending()
    }

    pub async fn refresh_favorites(&self) -> Result<usize, CoreError> {
        self.inner.favorites.refresh().await
    }

    /// Flush queued toggles now instead of waiting for the debounce.
    pub async fn flush_favorites(&self) -> Result<FlushOutcome, CoreError> {
        self.inner.favorites.flush().await
    }

    /// Toggle against the backend right away, bypassing the debounce.
    /// Meant for one-shot callers that exit after a single change.
    pub async fn toggle_favorite_now(&self, site: Site) -> Result<bool, CoreError> {
        let key = site.key();
        let current = self.favorites_snapshot();
        let is_fav = self.inner.favorites.toggle_favorite(site, &current).await?;
        self.inner
            .bridge
            .send(&OutboundMessage::FavoriteToggled { key, is_fav })?;
        Ok(is_fav)
    }

    // ── Background tasks ─────────────────────────────────────────

    /// Consume a position source until it ends or the controller is
    /// disposed.
    pub async fn track<S>(&self, positions: S)
    where
        S: Stream<Item = PositionEvent> + Send + 'static,
    {
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(position_task(self.clone(), Box::pin(positions), cancel));
        self.inner.task_handles.lock().await.push(handle);
    }

    /// Consume raw messages from the renderer.
    pub async fn listen_renderer(&self, inbound: mpsc::UnboundedReceiver<String>) {
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(renderer_task(self.clone(), inbound, cancel));
        self.inner.task_handles.lock().await.push(handle);
    }

    /// Stop background tasks and the favorite debounce timer. Queued
    /// favorite intents stay inspectable.
    pub async fn dispose(&self) {
        self.inner.cancel.cancel();
        self.inner.favorites.dispose();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("controller disposed");
    }

    // ── State observation ────────────────────────────────────────

    /// Take the receiving end of the native → renderer channel. Returns
    /// `None` after the first call.
    pub fn take_renderer_outbound(&self) -> Option<mpsc::UnboundedReceiver<String>> {
        crate::sync::locked(&self.inner.renderer_rx).take()
    }

    pub fn events(&self) -> broadcast::Receiver<UiEvent> {
        self.inner.events.subscribe()
    }

    pub fn panel_state(&self) -> PanelState {
        self.session().panel.state().clone()
    }

    pub fn radius(&self) -> RadiusSetting {
        self.session().tracker.radius().clone()
    }

    pub fn last_position(&self) -> Option<Coordinate> {
        self.session().tracker.last_position()
    }

    pub fn is_location_available(&self) -> bool {
        self.session().tracker.is_available()
    }

    /// Sites within the current radius of the last fix.
    pub fn nearby(&self) -> Vec<Site> {
        self.session()
            .tracker
            .nearby(self.inner.catalog.sites())
            .unwrap_or_default()
    }

    pub fn catalog(&self) -> &SiteCatalog {
        &self.inner.catalog
    }

    pub fn route_provider(&self) -> &R {
        &self.inner.routes
    }

    // ── Private helpers ──────────────────────────────────────────

    fn session(&self) -> MutexGuard<'_, Session> {
        crate::sync::locked(&self.inner.session)
    }

    fn emit(&self, event: UiEvent) {
        let _ = self.inner.events.send(event);
    }

    fn apply(&self, effects: Vec<PanelEffect>) -> Result<(), CoreError> {
        for effect in effects {
            match effect {
                PanelEffect::Open(site) => self.emit(UiEvent::PanelOpened(site)),
                PanelEffect::Close => self.emit(UiEvent::PanelClosed),
                PanelEffect::Render(msg) => {
                    self.inner.bridge.send(&msg)?;
                }
                PanelEffect::Notice(notice) => {
                    info!(?notice, "{}", notice.message());
                    self.emit(UiEvent::Notice(notice));
                }
            }
        }
        Ok(())
    }
}

// ── Background task implementations ──────────────────────────────

async fn position_task<R, B, C, S>(
    controller: Controller<R, B, C>,
    mut positions: Pin<Box<S>>,
    cancel: CancellationToken,
) where
    R: RouteProvider,
    B: FavoritesBackend,
    C: Connectivity,
    S: Stream<Item = PositionEvent> + Send + 'static,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = positions.next() => {
                let Some(event) = event else { break };
                match event {
                    PositionEvent::Fix(position) => {
                        if let Err(e) = controller.handle_position(position).await {
                            warn!(error = %e, "position update failed");
                        }
                    }
                    PositionEvent::PermissionDenied => controller.handle_permission_denied(),
                }
            }
        }
    }
    debug!("position task finished");
}

async fn renderer_task<R, B, C>(
    controller: Controller<R, B, C>,
    mut inbound: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) where
    R: RouteProvider,
    B: FavoritesBackend,
    C: Connectivity,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            raw = inbound.recv() => {
                let Some(raw) = raw else { break };
                // Errors are already logged by the handler.
                let _ = controller.handle_renderer_message(&raw);
            }
        }
    }
    debug!("renderer task finished");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::favorites::AlwaysOnline;
    use crate::model::{FavoriteRecord, SiteKey};

    // ── Test doubles ─────────────────────────────────────────────

    #[derive(Default)]
    struct MockRoutes {
        calls: AtomicUsize,
        no_path: AtomicBool,
        fail: AtomicBool,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockRoutes {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RouteProvider for MockRoutes {
        async fn route(
            &self,
            origin: Coordinate,
            destination: Coordinate,
        ) -> Result<Option<RouteResult>, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(CoreError::Network {
                    reason: "unreachable".into(),
                    status: None,
                });
            }
            if self.no_path.load(Ordering::SeqCst) {
                return Ok(None);
            }
            Ok(Some(RouteResult {
                distance_meters: 420.0,
                duration_seconds: 300.0,
                path: vec![origin, destination],
            }))
        }
    }

    #[derive(Default)]
    struct MemoryBackend {
        store: Mutex<HashMap<SiteKey, Site>>,
        batches: AtomicUsize,
    }

    impl FavoritesBackend for MemoryBackend {
        async fn list(&self) -> Result<Vec<FavoriteRecord>, CoreError> {
            Ok(self.records())
        }

        async fn submit_batch(
            &self,
            adds: Vec<Site>,
            removes: Vec<Site>,
        ) -> Result<Vec<FavoriteRecord>, CoreError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            {
                let mut store = self.store.lock().unwrap();
                for site in removes {
                    store.remove(&site.key());
                }
                for site in adds {
                    store.insert(site.key(), site);
                }
            }
            Ok(self.records())
        }
    }

    impl MemoryBackend {
        fn records(&self) -> Vec<FavoriteRecord> {
            self.store
                .lock()
                .unwrap()
                .iter()
                .map(|(key, site)| FavoriteRecord {
                    key: key.clone(),
                    site: site.clone(),
                })
                .collect()
        }
    }

    type TestController = Controller<MockRoutes, MemoryBackend, AlwaysOnline>;

    const HERE: Coordinate = Coordinate::new(37.5665, 126.9780);

    fn north(d: f64) -> Coordinate {
        Coordinate::new(HERE.latitude + d, HERE.longitude)
    }

    fn near_site() -> Site {
        Site::new("near", HERE.latitude + 0.0027, HERE.longitude)
    }

    fn far_site() -> Site {
        Site::new("far", HERE.latitude + 0.0072, HERE.longitude)
    }

    fn controller_with(
        routes: MockRoutes,
    ) -> (
        TestController,
        Arc<MemoryBackend>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let config = ControllerConfig {
            initial_radius_index: 0,
            ..ControllerConfig::default()
        };
        let backend = Arc::new(MemoryBackend::default());
        let controller = Controller::new(
            &config,
            SiteCatalog::new(vec![near_site(), far_site()]),
            routes,
            Arc::clone(&backend),
            Arc::new(AlwaysOnline),
        )
        .unwrap();
        let rx = controller.take_renderer_outbound().unwrap();
        (controller, backend, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            out.push(serde_json::from_str(&raw).unwrap());
        }
        out
    }

    fn marker_click(site: &Site) -> String {
        serde_json::json!({ "type": "marker_click", "payload": site }).to_string()
    }

    async fn routing_to_near(controller: &TestController) {
        controller.handle_position(HERE).await.unwrap();
        controller
            .handle_renderer_message(&marker_click(&near_site()))
            .unwrap();
        let outcome = controller.start_route().await.unwrap();
        assert!(matches!(outcome, RouteOutcome::Routed(_)));
    }

    // ── Nearby ───────────────────────────────────────────────────

    #[tokio::test]
    async fn position_fix_pushes_nearby_sites() {
        let (controller, _, mut rx) = controller_with(MockRoutes::default());
        controller.handle_position(HERE).await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![OutboundMessage::location_update(HERE, vec![near_site()])]
        );
    }

    #[tokio::test]
    async fn radius_change_recomputes_immediately() {
        let (controller, _, mut rx) = controller_with(MockRoutes::default());
        controller.handle_position(HERE).await.unwrap();
        drain(&mut rx);

        assert!(controller.increase_radius().unwrap());
        assert_eq!(
            drain(&mut rx),
            vec![OutboundMessage::location_update(
                HERE,
                vec![near_site(), far_site()]
            )]
        );
        assert_eq!(controller.radius().label(), "1km");
    }

    #[tokio::test]
    async fn radius_change_before_first_fix_sends_nothing() {
        let (controller, _, mut rx) = controller_with(MockRoutes::default());
        controller.set_radius_index(3).unwrap();
        assert!(drain(&mut rx).is_empty());
        assert!(matches!(
            controller.set_radius_index(42),
            Err(CoreError::InvalidRadius { .. })
        ));
    }

    #[tokio::test]
    async fn permission_denied_marks_unavailable() {
        let (controller, _, _rx) = controller_with(MockRoutes::default());
        let mut events = controller.events();
        controller.handle_permission_denied();
        assert!(!controller.is_location_available());
        assert_eq!(events.recv().await.unwrap(), UiEvent::NearbyUnavailable);
    }

    #[tokio::test]
    async fn permission_denied_blocks_routing_until_next_fix() {
        let (controller, _, _rx) = controller_with(MockRoutes::default());
        controller.handle_position(HERE).await.unwrap();
        controller.select_site(near_site()).unwrap();
        controller.handle_permission_denied();

        assert!(matches!(
            controller.start_route().await,
            Err(CoreError::PermissionDenied)
        ));
        assert!(matches!(
            controller.center_on_user(),
            Err(CoreError::PermissionDenied)
        ));
        assert_eq!(controller.route_provider().calls(), 0);

        controller.handle_position(HERE).await.unwrap();
        assert!(controller.center_on_user().unwrap());
        assert!(matches!(
            controller.start_route().await.unwrap(),
            RouteOutcome::Routed(_)
        ));
    }

    // ── Routing ──────────────────────────────────────────────────

    #[tokio::test]
    async fn start_route_draws_and_closes_panel() {
        let (controller, _, mut rx) = controller_with(MockRoutes::default());
        routing_to_near(&controller).await;

        let sent = drain(&mut rx);
        assert!(matches!(
            sent.last(),
            Some(OutboundMessage::DrawRoute { path }) if path.len() == 2
        ));
        assert!(matches!(
            controller.panel_state(),
            PanelState::RoutingActive { .. }
        ));
    }

    #[tokio::test]
    async fn start_route_without_fix_is_rejected() {
        let (controller, _, _rx) = controller_with(MockRoutes::default());
        controller.select_site(near_site()).unwrap();
        assert!(matches!(
            controller.start_route().await,
            Err(CoreError::PositionUnavailable)
        ));
        assert_eq!(controller.route_provider().calls(), 0);
    }

    #[tokio::test]
    async fn no_path_keeps_selection_and_notifies() {
        let routes = MockRoutes::default();
        routes.no_path.store(true, Ordering::SeqCst);
        let (controller, _, _rx) = controller_with(routes);
        let mut events = controller.events();

        controller.handle_position(HERE).await.unwrap();
        controller.select_site(near_site()).unwrap();
        assert_eq!(controller.start_route().await.unwrap(), RouteOutcome::NoPath);

        assert_eq!(controller.panel_state(), PanelState::Selected(near_site()));
        let mut saw_notice = false;
        while let Ok(event) = events.try_recv() {
            saw_notice |= event == UiEvent::Notice(RouteNotice::NoPath);
        }
        assert!(saw_notice);
    }

    #[tokio::test]
    async fn provider_failure_becomes_try_again() {
        let routes = MockRoutes::default();
        routes.fail.store(true, Ordering::SeqCst);
        let (controller, _, _rx) = controller_with(routes);

        controller.handle_position(HERE).await.unwrap();
        controller.select_site(near_site()).unwrap();
        let outcome = controller.start_route().await.unwrap();
        assert!(matches!(outcome, RouteOutcome::Failed { .. }));
        assert_eq!(controller.panel_state(), PanelState::Selected(near_site()));
    }

    #[tokio::test]
    async fn cancel_route_emits_clear_route() {
        let (controller, _, mut rx) = controller_with(MockRoutes::default());
        routing_to_near(&controller).await;
        drain(&mut rx);

        controller.cancel_route().unwrap();
        assert_eq!(drain(&mut rx), vec![OutboundMessage::ClearRoute]);
        assert_eq!(controller.panel_state(), PanelState::Closed);
        assert!(controller.cancel_route().is_err());
    }

    #[tokio::test]
    async fn marker_click_while_routing_clears_route() {
        let (controller, _, mut rx) = controller_with(MockRoutes::default());
        routing_to_near(&controller).await;
        drain(&mut rx);

        controller
            .handle_renderer_message(&marker_click(&far_site()))
            .unwrap();
        assert_eq!(drain(&mut rx), vec![OutboundMessage::ClearRoute]);
        assert_eq!(controller.panel_state(), PanelState::Selected(far_site()));
    }

    #[tokio::test]
    async fn reroute_threshold() {
        let (controller, _, _rx) = controller_with(MockRoutes::default());
        routing_to_near(&controller).await;
        assert_eq!(controller.route_provider().calls(), 1);

        // ~50 m: stay on the current route.
        controller.handle_position(north(0.00045)).await.unwrap();
        assert_eq!(controller.route_provider().calls(), 1);

        // ~150 m from the route origin: exactly one reroute.
        controller.handle_position(north(0.00135)).await.unwrap();
        assert_eq!(controller.route_provider().calls(), 2);

        // The anchor moved with the reroute.
        controller.handle_position(north(0.00135)).await.unwrap();
        assert_eq!(controller.route_provider().calls(), 2);
    }

    #[tokio::test]
    async fn failed_reroute_waits_for_the_next_threshold() {
        let (controller, _, _rx) = controller_with(MockRoutes::default());
        routing_to_near(&controller).await;
        controller.route_provider().fail.store(true, Ordering::SeqCst);

        controller.handle_position(north(0.00135)).await.unwrap();
        assert_eq!(controller.route_provider().calls(), 2);

        // Still failing, but no new request until another ~100 m.
        controller.handle_position(north(0.00140)).await.unwrap();
        controller.handle_position(north(0.00180)).await.unwrap();
        assert_eq!(controller.route_provider().calls(), 2);
        assert_eq!(controller.session().tracker.route_anchor(), Some(north(0.00135)));

        controller.handle_position(north(0.00270)).await.unwrap();
        assert_eq!(controller.route_provider().calls(), 3);
        assert!(matches!(
            controller.panel_state(),
            PanelState::RoutingActive { .. }
        ));
    }

    #[tokio::test]
    async fn stale_route_response_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let routes = MockRoutes {
            gate: Some(Arc::clone(&gate)),
            ..MockRoutes::default()
        };
        let (controller, _, mut rx) = controller_with(routes);
        controller.handle_position(HERE).await.unwrap();
        controller.select_site(near_site()).unwrap();

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.start_route().await }
        });
        while controller.route_provider().calls() == 0 {
            tokio::task::yield_now().await;
        }

        controller.select_site(far_site()).unwrap();
        drain(&mut rx);
        gate.add_permits(1);

        assert_eq!(pending.await.unwrap().unwrap(), RouteOutcome::Superseded);
        assert_eq!(controller.panel_state(), PanelState::Selected(far_site()));
        assert!(drain(&mut rx).is_empty(), "no draw_route for a stale response");
    }

    #[tokio::test]
    async fn unknown_renderer_message_is_rejected() {
        let (controller, _, _rx) = controller_with(MockRoutes::default());
        let err = controller
            .handle_renderer_message(r#"{"type":"zoom_changed","level":3}"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::Bridge(_)));
        assert_eq!(controller.panel_state(), PanelState::Closed);
    }

    #[tokio::test]
    async fn center_on_user_needs_a_fix() {
        let (controller, _, mut rx) = controller_with(MockRoutes::default());
        assert!(!controller.center_on_user().unwrap());
        controller.handle_position(HERE).await.unwrap();
        drain(&mut rx);
        assert!(controller.center_on_user().unwrap());
        assert_eq!(drain(&mut rx), vec![OutboundMessage::center(HERE)]);
    }

    // ── Favorites ────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn toggle_favorite_is_optimistic_and_debounced() {
        let (controller, backend, mut rx) = controller_with(MockRoutes::default());

        assert!(controller.toggle_favorite(near_site()).unwrap());
        assert!(controller.is_favorite(&near_site()));
        assert_eq!(
            drain(&mut rx),
            vec![OutboundMessage::FavoriteToggled {
                key: near_site().key(),
                is_fav: true
            }]
        );
        assert_eq!(backend.batches.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(backend.batches.load(Ordering::SeqCst), 1);
        assert!(controller.pending_favorites().is_empty());
        assert!(controller.is_favorite(&near_site()));
    }

    #[tokio::test]
    async fn refresh_loads_server_favorites() {
        let (controller, backend, _rx) = controller_with(MockRoutes::default());
        backend
            .store
            .lock()
            .unwrap()
            .insert(far_site().key(), far_site());

        assert_eq!(controller.refresh_favorites().await.unwrap(), 1);
        assert!(controller.is_favorite(&far_site()));
        assert_eq!(controller.favorites_snapshot().len(), 1);
    }

    // ── Background tasks ─────────────────────────────────────────

    #[tokio::test]
    async fn track_consumes_position_stream() {
        let (controller, _, mut rx) = controller_with(MockRoutes::default());
        let events = vec![
            PositionEvent::PermissionDenied,
            PositionEvent::Fix(HERE),
        ];
        controller.track(tokio_stream::iter(events)).await;

        let raw = rx.recv().await.unwrap();
        let msg: OutboundMessage = serde_json::from_str(&raw).unwrap();
        assert!(matches!(msg, OutboundMessage::LocationUpdate { .. }));

        controller.dispose().await;
        assert!(controller.is_location_available());
        assert_eq!(controller.last_position(), Some(HERE));
    }

    #[tokio::test]
    async fn renderer_listener_routes_marker_clicks() {
        let (controller, _, _rx) = controller_with(MockRoutes::default());
        let (tx, inbound) = mpsc::unbounded_channel();
        controller.listen_renderer(inbound).await;
        let mut events = controller.events();

        tx.send("garbage".to_string()).unwrap();
        tx.send(marker_click(&near_site())).unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            UiEvent::PanelOpened(near_site())
        );
        controller.dispose().await;
    }
}
