// Wire types for the favorites backend.
//
// Field names follow the backend's JSON exactly. The site snapshot inside a
// favorite is called `toilet` on the wire; `site` is accepted as an alias.

use serde::{Deserialize, Deserializer, Serialize};

/// A site as the favorites backend stores it.
///
/// The backend has historically sent coordinates as either numbers or
/// numeric strings, so both are accepted on the way in. Outgoing requests
/// always carry numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
}

/// One favorite as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteItem {
    pub key: String,
    #[serde(alias = "site")]
    pub toilet: WireSite,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body of `POST /favorites/batch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchRequest {
    pub adds: Vec<WireSite>,
    pub removes: Vec<WireSite>,
}

impl BatchRequest {
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }
}

/// `{ success, items, message? }` envelope shared by both endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct FavoritesEnvelope {
    pub success: bool,
    #[serde(default)]
    pub items: Vec<FavoriteItem>,
    #[serde(default)]
    pub message: Option<String>,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn site_accepts_string_coordinates() {
        let site: WireSite = serde_json::from_value(json!({
            "name": "Station A",
            "lat": "37.5665",
            "lng": 126.978
        }))
        .unwrap();
        assert!((site.lat - 37.5665).abs() < f64::EPSILON);
        assert!((site.lng - 126.978).abs() < f64::EPSILON);
    }

    #[test]
    fn item_accepts_site_alias() {
        let item: FavoriteItem = serde_json::from_value(json!({
            "key": "k",
            "site": { "name": "A", "lat": 1.0, "lng": 2.0 }
        }))
        .unwrap();
        assert_eq!(item.toilet.name, "A");
        assert!(item.created_at.is_none());
    }

    #[test]
    fn request_omits_absent_optionals() {
        let req = BatchRequest {
            adds: vec![WireSite {
                id: None,
                name: "A".into(),
                lat: 1.0,
                lng: 2.0,
                address: None,
                opening_hours: None,
            }],
            removes: vec![],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({ "adds": [{ "name": "A", "lat": 1.0, "lng": 2.0 }], "removes": [] })
        );
    }
}
