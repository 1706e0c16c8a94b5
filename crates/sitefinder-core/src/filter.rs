//! Radius filtering over the site catalog.

use crate::geo::distance_km;
use crate::model::{Coordinate, Site};

/// Sites within `radius_km` of `position`, boundary inclusive, in catalog
/// order.
pub fn nearby(position: Coordinate, radius_km: f64, catalog: &[Site]) -> Vec<Site> {
    catalog
        .iter()
        .filter(|site| distance_km(position, site.coordinate()) <= radius_km)
        .cloned()
        .collect()
}
