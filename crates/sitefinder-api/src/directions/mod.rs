mod client;
mod models;

pub use client::DirectionsClient;
pub use models::{DirectionsRoute, LineString, Waypoint};
