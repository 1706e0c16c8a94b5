//! Configuration for sitefinder.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `sitefinder_core::ControllerConfig`. The CLI layers its
//! `GlobalOpts` overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sitefinder_core::config::{DEFAULT_FAVORITE_DEBOUNCE, DEFAULT_REROUTE_THRESHOLD_KM};
use sitefinder_core::model::{DEFAULT_RADIUS_INDEX, DEFAULT_RADIUS_OPTIONS_KM};
use sitefinder_core::{ControllerConfig, RadiusSetting, TlsMode};

/// Keyring service name for stored tokens.
pub const KEYRING_SERVICE: &str = "sitefinder";

/// Overrides the config file location when set.
pub const CONFIG_PATH_ENV: &str = "SITEFINDER_CONFIG";

const DEFAULT_DIRECTIONS_URL: &str = "https://api.mapbox.com";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {token} configured for profile '{profile}'")]
    NoCredentials {
        profile: String,
        token: &'static str,
    },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Site catalog used when a profile does not name one.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            catalog: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    20
}

/// A named backend profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Favorites backend base URL.
    pub api_url: String,

    /// Bearer token (plaintext; prefer keyring or env var).
    pub api_token: Option<String>,

    /// Environment variable holding the bearer token.
    pub api_token_env: Option<String>,

    /// Walking-directions base URL.
    pub directions_url: Option<String>,

    /// Directions access token (plaintext; prefer keyring or env var).
    pub directions_token: Option<String>,

    /// Environment variable holding the directions token.
    pub directions_token_env: Option<String>,

    /// Site catalog JSON file.
    pub catalog: Option<PathBuf>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Radius choices in kilometers, ascending.
    pub radius_options: Option<Vec<f64>>,

    /// Starting index into the radius choices.
    pub radius_index: Option<usize>,

    pub favorite_debounce_ms: Option<u64>,

    pub reroute_threshold_m: Option<f64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$SITEFINDER_CONFIG`, then platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "sitefinder", "sitefinder").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sitefinder");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file, layered as defaults → file → `SITEFINDER_`
/// env. Nested keys use a double underscore (`SITEFINDER_DEFAULTS__OUTPUT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SITEFINDER_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Token resolution (without CLI flags) ────────────────────────────

/// Which stored token to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Api,
    Directions,
}

impl TokenKind {
    /// Keyring account suffix.
    pub fn account(self) -> &'static str {
        match self {
            Self::Api => "api-token",
            Self::Directions => "directions-token",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Api => "favorites API token",
            Self::Directions => "directions access token",
        }
    }
}

/// Resolve a token from the chain: profile-named env var, system keyring,
/// plaintext in the profile.
pub fn resolve_token(
    profile: &Profile,
    profile_name: &str,
    kind: TokenKind,
) -> Result<SecretString, ConfigError> {
    let (env_name, plaintext) = match kind {
        TokenKind::Api => (&profile.api_token_env, &profile.api_token),
        TokenKind::Directions => (&profile.directions_token_env, &profile.directions_token),
    };

    // 1. Profile's *_env → env var lookup
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{}", kind.account()),
    ) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(token) = plaintext {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        token: kind.describe(),
    })
}

/// Store a token in the system keyring.
pub fn store_token(profile_name: &str, kind: TokenKind, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{}", kind.account()),
    )
    .map_err(|e| ConfigError::Validation {
        field: "keyring".into(),
        reason: e.to_string(),
    })?;
    entry
        .set_password(token)
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation to ControllerConfig ─────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `ControllerConfig` from a profile, no CLI flag overrides.
///
/// Tokens that cannot be resolved are left empty; the service that needs
/// one rejects the request with an authentication error.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ControllerConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    let directions_url = parse_url(
        "directions_url",
        profile
            .directions_url
            .as_deref()
            .unwrap_or(DEFAULT_DIRECTIONS_URL),
    )?;

    let empty = || SecretString::from(String::new());
    let api_token = resolve_token(profile, profile_name, TokenKind::Api).unwrap_or_else(|_| empty());
    let directions_token =
        resolve_token(profile, profile_name, TokenKind::Directions).unwrap_or_else(|_| empty());

    let tls = profile
        .ca_cert
        .as_ref()
        .map_or(TlsMode::System, |ca| TlsMode::CustomCa(ca.clone()));

    let radius_options_km = profile
        .radius_options
        .clone()
        .unwrap_or_else(|| DEFAULT_RADIUS_OPTIONS_KM.to_vec());
    let initial_radius_index = profile.radius_index.unwrap_or(DEFAULT_RADIUS_INDEX);
    RadiusSetting::new(radius_options_km.clone(), initial_radius_index).map_err(|e| {
        ConfigError::Validation {
            field: "radius_options".into(),
            reason: e.to_string(),
        }
    })?;

    let reroute_threshold_km = match profile.reroute_threshold_m {
        Some(m) if !m.is_finite() || m <= 0.0 => {
            return Err(ConfigError::Validation {
                field: "reroute_threshold_m".into(),
                reason: format!("must be a positive distance, got {m}"),
            });
        }
        Some(m) => m / 1000.0,
        None => DEFAULT_REROUTE_THRESHOLD_KM,
    };

    Ok(ControllerConfig {
        api_url,
        api_token,
        directions_url,
        directions_token,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout)),
        radius_options_km,
        initial_radius_index,
        favorite_debounce: profile
            .favorite_debounce_ms
            .map_or(DEFAULT_FAVORITE_DEBOUNCE, Duration::from_millis),
        reroute_threshold_km,
        ..ControllerConfig::default()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), body).unwrap();
        file
    }

    #[test]
    fn loads_profiles_from_file() {
        let file = write_config(
            r#"
default_profile = "home"

[defaults]
output = "json"

[profiles.home]
api_url = "https://favorites.example.com"
directions_token = "pk.plain"
radius_index = 3
"#,
        );
        let config = load_config_from(file.path()).unwrap();

        assert_eq!(config.default_profile_name(), "home");
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.color, "auto");
        let profile = config.profile("home").unwrap();
        assert_eq!(profile.radius_index, Some(3));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile_name(), "default");
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let config = Config::default();
        assert!(matches!(
            config.profile("nope"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn profile_translates_to_controller_config() {
        let profile = Profile {
            api_url: "https://favorites.example.com".into(),
            directions_token: Some("pk.plain".into()),
            timeout: Some(5),
            radius_index: Some(0),
            reroute_threshold_m: Some(250.0),
            ..Profile::default()
        };
        let config = profile_to_controller_config(&profile, "sitefinder-test-unstored").unwrap();

        assert_eq!(config.api_url.as_str(), "https://favorites.example.com/");
        assert_eq!(config.directions_url.as_str(), "https://api.mapbox.com/");
        assert_eq!(config.directions_token.expose_secret(), "pk.plain");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.initial_radius_index, 0);
        assert!((config.reroute_threshold_km - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.favorite_debounce, DEFAULT_FAVORITE_DEBOUNCE);
    }

    #[test]
    fn rejects_bad_url() {
        let profile = Profile {
            api_url: "not a url".into(),
            ..Profile::default()
        };
        let err = profile_to_controller_config(&profile, "x").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_url"));
    }

    #[test]
    fn rejects_out_of_range_radius_index() {
        let profile = Profile {
            api_url: "https://favorites.example.com".into(),
            radius_index: Some(9),
            ..Profile::default()
        };
        assert!(profile_to_controller_config(&profile, "x").is_err());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                api_url: "https://favorites.example.com".into(),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(
            loaded.profile("default").unwrap().api_url,
            "https://favorites.example.com"
        );
    }
}
