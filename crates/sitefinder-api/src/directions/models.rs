// Wire types for the walking-directions service (Mapbox Directions v5).

use serde::Deserialize;

/// A route endpoint in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Top-level directions response. `routes` is empty when no path exists.
#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

/// A single route in provider-native units: meters, seconds, and GeoJSON
/// `[longitude, latitude]` pairs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectionsRoute {
    pub distance: f64,
    pub duration: f64,
    pub geometry: LineString,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineString {
    pub coordinates: Vec<[f64; 2]>,
}
