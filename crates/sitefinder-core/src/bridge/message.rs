// ── Renderer wire protocol ──
//
// Every message is a JSON object with a `type` discriminator. Field names
// are part of the contract with the embedded map page and must not drift.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::{Coordinate, Site, SiteKey};

/// Errors decoding or encoding bridge messages.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("message is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("message has no string `type` field")]
    MissingType,

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("invalid '{kind}' payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode '{kind}' message: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Native → renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Move the user marker, recenter, and replace every site marker.
    LocationUpdate {
        latitude: f64,
        longitude: f64,
        toilets: Vec<Site>,
    },
    /// Replace the drawn route polyline.
    DrawRoute { path: Vec<Coordinate> },
    /// Remove the route polyline, if any.
    ClearRoute,
    /// Pan to a position without touching markers.
    CenterLocation { latitude: f64, longitude: f64 },
    /// Flip the favorite badge on one marker.
    FavoriteToggled {
        key: SiteKey,
        #[serde(rename = "isFav")]
        is_fav: bool,
    },
}

impl OutboundMessage {
    pub fn location_update(position: Coordinate, sites: Vec<Site>) -> Self {
        Self::LocationUpdate {
            latitude: position.latitude,
            longitude: position.longitude,
            toilets: sites,
        }
    }

    pub fn center(position: Coordinate) -> Self {
        Self::CenterLocation {
            latitude: position.latitude,
            longitude: position.longitude,
        }
    }

    /// The `type` discriminator, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LocationUpdate { .. } => "location_update",
            Self::DrawRoute { .. } => "draw_route",
            Self::ClearRoute => "clear_route",
            Self::CenterLocation { .. } => "center_location",
            Self::FavoriteToggled { .. } => "favorite_toggled",
        }
    }

    pub fn encode(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(|source| BridgeError::Encode {
            kind: self.kind(),
            source,
        })
    }
}

/// Renderer → native.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    MarkerClick { payload: Site },
}

impl InboundMessage {
    const KINDS: &'static [&'static str] = &["marker_click"];

    /// Strict decode: the `type` must be one we know, and its payload
    /// must be complete.
    pub fn decode(raw: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(raw).map_err(BridgeError::MalformedJson)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(BridgeError::MissingType)?
            .to_owned();
        if !Self::KINDS.contains(&kind.as_str()) {
            return Err(BridgeError::UnknownType(kind));
        }
        serde_json::from_value(value).map_err(|source| BridgeError::InvalidPayload { kind, source })
    }
}
