// ── Location tracking ──
//
// Owns the last known position, the selected radius, and the reroute
// anchor. Pure state: the controller feeds it fixes and acts on what it
// returns.

use tracing::{debug, info};

use crate::error::CoreError;
use crate::geo::distance_km;
use crate::model::{Coordinate, RadiusSetting, Site};

/// One item from a position source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionEvent {
    Fix(Coordinate),
    PermissionDenied,
}

/// Result of observing a new fix.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub position: Coordinate,
    pub nearby: Vec<Site>,
    /// The user has moved far enough from the last route origin that the
    /// active route should be recomputed from `position`.
    pub reroute: bool,
}

#[derive(Debug, Clone)]
pub struct LocationTracker {
    radius: RadiusSetting,
    reroute_threshold_km: f64,
    last_position: Option<Coordinate>,
    /// Position the active route was last computed from.
    anchor: Option<Coordinate>,
    available: bool,
}

impl LocationTracker {
    pub fn new(radius: RadiusSetting, reroute_threshold_km: f64) -> Self {
        Self {
            radius,
            reroute_threshold_km,
            last_position: None,
            anchor: None,
            available: true,
        }
    }

    /// Record a fix and compute the nearby set.
    ///
    /// When `routing_active` and the fix is more than the threshold from
    /// the anchor, `reroute` is set. With routing active but no anchor, the
    /// fix becomes the anchor without a reroute.
    pub fn observe(
        &mut self,
        position: Coordinate,
        catalog: &[Site],
        routing_active: bool,
    ) -> PositionUpdate {
        if !self.available {
            info!("position fix received, nearby search available again");
        }
        self.available = true;
        self.last_position = Some(position);
        let nearby = crate::filter::nearby(position, self.radius.km(), catalog);

        let reroute = if routing_active {
            match self.anchor {
                Some(anchor) => {
                    let moved = distance_km(anchor, position);
                    let reroute = moved > self.reroute_threshold_km;
                    if reroute {
                        debug!(moved_km = moved, "moved past reroute threshold");
                    }
                    reroute
                }
                None => {
                    self.anchor = Some(position);
                    false
                }
            }
        } else {
            self.anchor = None;
            false
        };

        PositionUpdate {
            position,
            nearby,
            reroute,
        }
    }

    /// Nearby set for the current radius at the last known position.
    pub fn nearby(&self, catalog: &[Site]) -> Option<Vec<Site>> {
        self.last_position
            .map(|p| crate::filter::nearby(p, self.radius.km(), catalog))
    }

    pub fn set_radius_index(&mut self, index: usize) -> Result<(), CoreError> {
        self.radius.set_index(index)
    }

    pub fn increase_radius(&mut self) -> bool {
        self.radius.increase()
    }

    pub fn decrease_radius(&mut self) -> bool {
        self.radius.decrease()
    }

    pub fn radius(&self) -> &RadiusSetting {
        &self.radius
    }

    /// A route was computed from `origin`.
    pub fn anchor_route(&mut self, origin: Coordinate) {
        self.anchor = Some(origin);
    }

    pub fn clear_route_anchor(&mut self) {
        self.anchor = None;
    }

    pub fn route_anchor(&self) -> Option<Coordinate> {
        self.anchor
    }

    pub fn mark_permission_denied(&mut self) {
        self.available = false;
    }

    /// `false` after a permission denial until the next fix arrives.
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn last_position(&self) -> Option<Coordinate> {
        self.last_position
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ORIGIN: Coordinate = Coordinate::new(37.5665, 126.9780);

    fn north_by_degrees(d: f64) -> Coordinate {
        Coordinate::new(ORIGIN.latitude + d, ORIGIN.longitude)
    }

    fn tracker() -> LocationTracker {
        LocationTracker::new(RadiusSetting::default(), 0.1)
    }

    #[test]
    fn not_routing_never_reroutes() {
        let mut t = tracker();
        t.anchor_route(ORIGIN);
        let update = t.observe(north_by_degrees(0.01), &[], false);
        assert!(!update.reroute);
        assert!(t.route_anchor().is_none());
    }

    #[test]
    fn small_move_does_not_reroute() {
        let mut t = tracker();
        t.anchor_route(ORIGIN);
        // ~50 m
        assert!(!t.observe(north_by_degrees(0.00045), &[], true).reroute);
    }

    #[test]
    fn large_move_reroutes() {
        let mut t = tracker();
        t.anchor_route(ORIGIN);
        // ~150 m
        assert!(t.observe(north_by_degrees(0.00135), &[], true).reroute);
    }

    #[test]
    fn first_fix_while_routing_becomes_anchor() {
        let mut t = tracker();
        assert!(!t.observe(ORIGIN, &[], true).reroute);
        assert_eq!(t.route_anchor(), Some(ORIGIN));
    }

    #[test]
    fn radius_change_recomputes_from_last_position() {
        let catalog = vec![Site::new("1.2km", ORIGIN.latitude + 0.0108, ORIGIN.longitude)];
        let mut t = tracker();
        assert!(t.nearby(&catalog).is_none());

        assert!(t.observe(ORIGIN, &catalog, false).nearby.is_empty());
        t.set_radius_index(2).unwrap();
        assert_eq!(t.nearby(&catalog).unwrap().len(), 1);
    }

    #[test]
    fn permission_denial_clears_on_next_fix() {
        let mut t = tracker();
        t.mark_permission_denied();
        assert!(!t.is_available());
        t.observe(ORIGIN, &[], false);
        assert!(t.is_available());
    }
}
