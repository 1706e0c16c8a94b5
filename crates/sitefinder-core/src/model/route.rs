use serde::{Deserialize, Serialize};

use super::Coordinate;

/// A walking route as the engine and renderer see it.
///
/// `path` is always latitude/longitude ordered, whatever order the
/// provider used on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub path: Vec<Coordinate>,
}

impl RouteResult {
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            distance: format!("{:.2} km", self.distance_meters / 1000.0),
            duration: format!("{:.0} min", (self.duration_seconds / 60.0).round()),
        }
    }
}

/// Display strings for the active-route banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub distance: String,
    pub duration: String,
}

/// User-visible outcome of a route request that did not produce a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteNotice {
    /// The provider answered, but there is no walkable path.
    NoPath,
    /// The provider could not be reached or failed.
    TryAgain,
}

impl RouteNotice {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoPath => "No walking route found to this place.",
            Self::TryAgain => "Could not load directions. Please try again.",
        }
    }
}
