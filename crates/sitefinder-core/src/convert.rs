// ── Wire ↔ domain conversions ──
//
// The only place that knows both `sitefinder_api` wire shapes and the
// engine's model types.

use sitefinder_api::{DirectionsRoute, FavoriteItem, Waypoint, WireSite};

use crate::model::{Coordinate, FavoriteRecord, RouteResult, Site, SiteKey};

impl From<Coordinate> for Waypoint {
    fn from(c: Coordinate) -> Self {
        Waypoint {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

impl From<DirectionsRoute> for RouteResult {
    fn from(route: DirectionsRoute) -> Self {
        RouteResult {
            distance_meters: route.distance,
            duration_seconds: route.duration,
            // GeoJSON pairs are [longitude, latitude].
            path: route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lng, lat]| Coordinate::new(lat, lng))
                .collect(),
        }
    }
}

impl From<&Site> for WireSite {
    fn from(site: &Site) -> Self {
        WireSite {
            id: site.id.clone(),
            name: site.name.clone(),
            lat: site.lat,
            lng: site.lng,
            address: site.address.clone(),
            opening_hours: site.opening_hours.clone(),
        }
    }
}

impl From<WireSite> for Site {
    fn from(w: WireSite) -> Self {
        Site {
            id: w.id,
            name: w.name,
            lat: w.lat,
            lng: w.lng,
            address: w.address,
            opening_hours: w.opening_hours,
        }
    }
}

impl From<FavoriteItem> for FavoriteRecord {
    fn from(item: FavoriteItem) -> Self {
        FavoriteRecord {
            key: SiteKey::from(item.key),
            site: item.toilet.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitefinder_api::directions::LineString;

    #[test]
    fn route_path_is_flipped_to_lat_lng() {
        let route = DirectionsRoute {
            distance: 100.0,
            duration: 60.0,
            geometry: LineString {
                coordinates: vec![[126.978, 37.5665], [126.98, 37.57]],
            },
        };
        let result = RouteResult::from(route);
        assert_eq!(
            result.path,
            vec![
                Coordinate::new(37.5665, 126.978),
                Coordinate::new(37.57, 126.98)
            ]
        );
    }

    #[test]
    fn favorite_keeps_backend_key() {
        let item = FavoriteItem {
            key: "server-key".into(),
            toilet: WireSite::from(&Site::new("A", 1.0, 2.0)),
            created_at: None,
            updated_at: None,
        };
        let record = FavoriteRecord::from(item);
        assert_eq!(record.key.as_str(), "server-key");
        assert_eq!(record.site.name, "A");
    }
}
