// ── Runtime engine configuration ──
//
// Describes which services to talk to and how the engine behaves. Never
// touches disk; the CLI builds a `ControllerConfig` from its profile and
// hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

pub use sitefinder_api::TlsMode;

use crate::model::{DEFAULT_RADIUS_INDEX, DEFAULT_RADIUS_OPTIONS_KM};

/// Debounce window for favorite toggles.
pub const DEFAULT_FAVORITE_DEBOUNCE: Duration = Duration::from_millis(600);

/// Movement since the last route that triggers a reroute.
pub const DEFAULT_REROUTE_THRESHOLD_KM: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Favorites backend base URL.
    pub api_url: Url,
    /// Bearer token for the favorites backend.
    pub api_token: SecretString,
    /// Walking-directions service base URL.
    pub directions_url: Url,
    /// Access token for the directions service.
    pub directions_token: SecretString,
    pub tls: TlsMode,
    /// Per-request timeout for both services.
    pub timeout: Duration,
    /// Ascending radius choices in kilometers.
    pub radius_options_km: Vec<f64>,
    pub initial_radius_index: usize,
    pub favorite_debounce: Duration,
    pub reroute_threshold_km: f64,
    /// Minimum interval between position fixes. Passed through to the
    /// location source, not enforced here.
    pub position_min_interval: Duration,
    /// Minimum movement between position fixes, in meters. Passed through
    /// to the location source.
    pub position_min_distance_m: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("http://localhost:4000").expect("static URL is valid"),
            api_token: SecretString::from(String::new()),
            directions_url: Url::parse("https://api.mapbox.com").expect("static URL is valid"),
            directions_token: SecretString::from(String::new()),
            tls: TlsMode::System,
            timeout: Duration::from_secs(20),
            radius_options_km: DEFAULT_RADIUS_OPTIONS_KM.to_vec(),
            initial_radius_index: DEFAULT_RADIUS_INDEX,
            favorite_debounce: DEFAULT_FAVORITE_DEBOUNCE,
            reroute_threshold_km: DEFAULT_REROUTE_THRESHOLD_KM,
            position_min_interval: Duration::from_secs(5),
            position_min_distance_m: 10.0,
        }
    }
}
