// ── Renderer state model ──
//
// What the embedded map page holds after applying a sequence of outbound
// messages. `sitefinder track --print-state` replays its stream through
// this model and prints the result.

use std::collections::BTreeSet;

use serde::Serialize;

use super::message::OutboundMessage;
use crate::error::CoreError;
use crate::model::{Coordinate, Site, SiteKey};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererModel {
    pub user_marker: Option<Coordinate>,
    pub center: Option<Coordinate>,
    pub markers: Vec<Site>,
    pub route: Option<Vec<Coordinate>>,
    pub favorite_badges: BTreeSet<SiteKey>,
}

impl RendererModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, msg: &OutboundMessage) {
        match msg {
            OutboundMessage::LocationUpdate {
                latitude,
                longitude,
                toilets,
            } => {
                let at = Coordinate::new(*latitude, *longitude);
                self.user_marker = Some(at);
                self.center = Some(at);
                // Full replace; markers never accumulate across updates.
                self.markers.clone_from(toilets);
            }
            OutboundMessage::DrawRoute { path } => self.route = Some(path.clone()),
            OutboundMessage::ClearRoute => self.route = None,
            OutboundMessage::CenterLocation {
                latitude,
                longitude,
            } => self.center = Some(Coordinate::new(*latitude, *longitude)),
            OutboundMessage::FavoriteToggled { key, is_fav } => {
                if *is_fav {
                    self.favorite_badges.insert(key.clone());
                } else {
                    self.favorite_badges.remove(key);
                }
            }
        }
    }

    /// Decode a raw outbound payload and apply it.
    pub fn apply_raw(&mut self, raw: &str) -> Result<(), CoreError> {
        let msg: OutboundMessage = serde_json::from_str(raw).map_err(|e| {
            CoreError::Internal(format!("renderer received undecodable message: {e}"))
        })?;
        self.apply(&msg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(sites: Vec<Site>) -> OutboundMessage {
        OutboundMessage::location_update(Coordinate::new(37.5, 127.0), sites)
    }

    #[test]
    fn location_update_replaces_markers() {
        let mut model = RendererModel::new();
        model.apply(&update(vec![Site::new("A", 1.0, 1.0), Site::new("B", 2.0, 2.0)]));
        model.apply(&update(vec![Site::new("C", 3.0, 3.0)]));
        assert_eq!(model.markers.len(), 1);
        assert_eq!(model.markers[0].name, "C");
    }

    #[test]
    fn repeated_update_is_idempotent() {
        let msg = update(vec![Site::new("A", 1.0, 1.0)]);
        let mut once = RendererModel::new();
        once.apply(&msg);
        let mut twice = once.clone();
        twice.apply(&msg);
        assert_eq!(once, twice);
    }

    #[test]
    fn draw_route_replaces_previous() {
        let mut model = RendererModel::new();
        model.apply(&OutboundMessage::DrawRoute {
            path: vec![Coordinate::new(1.0, 1.0)],
        });
        model.apply(&OutboundMessage::DrawRoute {
            path: vec![Coordinate::new(2.0, 2.0), Coordinate::new(3.0, 3.0)],
        });
        assert_eq!(model.route.as_ref().map(Vec::len), Some(2));
        model.apply(&OutboundMessage::ClearRoute);
        assert!(model.route.is_none());
    }

    #[test]
    fn center_does_not_touch_markers() {
        let mut model = RendererModel::new();
        model.apply(&update(vec![Site::new("A", 1.0, 1.0)]));
        model.apply(&OutboundMessage::center(Coordinate::new(9.0, 9.0)));
        assert_eq!(model.markers.len(), 1);
        assert_eq!(model.center, Some(Coordinate::new(9.0, 9.0)));
        assert_eq!(model.user_marker, Some(Coordinate::new(37.5, 127.0)));
    }
}
