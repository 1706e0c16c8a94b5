//! CLI configuration -- thin wrapper around `sitefinder_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--api-url, --api-token, etc.).

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use sitefinder_core::{ControllerConfig, SiteCatalog};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use sitefinder_config::{
    Config, Profile, TokenKind, config_path, load_config_or_default, save_config, store_token,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `ControllerConfig` from the config file, profile, and CLI
/// overrides. Flags take priority over profile values.
///
/// With `require_backend`, a favorites API URL must come from a profile or
/// `--api-url`.
pub fn controller_config(
    global: &GlobalOpts,
    cfg: &Config,
    require_backend: bool,
) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut config = match cfg.profiles.get(&profile_name) {
        Some(profile) => sitefinder_config::profile_to_controller_config(profile, &profile_name)?,
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        None if require_backend && global.api_url.is_none() => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        None => ControllerConfig {
            timeout: Duration::from_secs(cfg.defaults.timeout),
            ..ControllerConfig::default()
        },
    };

    if let Some(ref raw) = global.api_url {
        config.api_url = parse_url("api-url", raw)?;
    }
    if let Some(ref raw) = global.directions_url {
        config.directions_url = parse_url("directions-url", raw)?;
    }
    if let Some(ref token) = global.api_token {
        config.api_token = SecretString::from(token.clone());
    }
    if let Some(ref token) = global.directions_token {
        config.directions_token = SecretString::from(token.clone());
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

/// Fail with a credentials error when `token` resolved to nothing.
pub fn require_token(
    token: &SecretString,
    kind: TokenKind,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<(), CliError> {
    if token.expose_secret().is_empty() {
        return Err(CliError::NoCredentials {
            profile: active_profile_name(global, cfg),
            token: match kind {
                TokenKind::Api => "favorites API token".into(),
                TokenKind::Directions => "directions access token".into(),
            },
        });
    }
    Ok(())
}

/// Catalog path: `--catalog`, then the profile, then `[defaults]`.
pub fn catalog_path(global: &GlobalOpts, cfg: &Config) -> Result<PathBuf, CliError> {
    if let Some(ref path) = global.catalog {
        return Ok(path.clone());
    }
    let profile_name = active_profile_name(global, cfg);
    cfg.profiles
        .get(&profile_name)
        .and_then(|p| p.catalog.clone())
        .or_else(|| cfg.defaults.catalog.clone())
        .ok_or(CliError::NoCatalog)
}

pub fn load_catalog(global: &GlobalOpts, cfg: &Config) -> Result<SiteCatalog, CliError> {
    let path = catalog_path(global, cfg)?;
    Ok(SiteCatalog::load(&path)?)
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
