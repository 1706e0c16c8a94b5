//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sitefinder_config::ConfigError;
use sitefinder_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the service: {reason}")]
    #[diagnostic(
        code(sitefinder::connection_failed),
        help("Check the network and the configured api_url / directions_url.")
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(sitefinder::timeout),
        help("Increase timeout with --timeout or check service responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(sitefinder::auth_failed),
        help(
            "The stored token was rejected. Store a fresh one with:\n\
             sitefinder config set-token api --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No {token} configured for profile '{profile}'")]
    #[diagnostic(
        code(sitefinder::no_credentials),
        help(
            "Store one with: sitefinder config set-token\n\
             Or set SITEFINDER_API_TOKEN / SITEFINDER_DIRECTIONS_TOKEN."
        )
    )]
    NoCredentials { profile: String, token: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(sitefinder::not_found),
        help("Run: sitefinder {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No walking route to '{site}'")]
    #[diagnostic(
        code(sitefinder::no_route),
        help("The directions service found no path. Try a nearer site.")
    )]
    NoRoute { site: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(sitefinder::api_error))]
    ApiError { message: String },

    // ── Location ─────────────────────────────────────────────────────
    #[error("Location unavailable: {reason}")]
    #[diagnostic(code(sitefinder::location))]
    LocationUnavailable { reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sitefinder::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(sitefinder::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: sitefinder config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No favorites backend configured")]
    #[diagnostic(
        code(sitefinder::no_config),
        help(
            "Create a profile with: sitefinder config init\n\
             Or pass --api-url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("No site catalog configured")]
    #[diagnostic(
        code(sitefinder::no_catalog),
        help("Pass --catalog <FILE>, set SITEFINDER_CATALOG, or add `catalog` to your profile.")
    )]
    NoCatalog,

    #[error(transparent)]
    #[diagnostic(code(sitefinder::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(sitefinder::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::NoRoute { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::LocationUnavailable { .. } => exit_code::PERMISSION,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Network { reason, .. } => CliError::ConnectionFailed { reason },

            CoreError::Timeout => CliError::Timeout,

            CoreError::AuthExpired { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::Api { message, .. } => CliError::ApiError { message },

            CoreError::PermissionDenied => CliError::LocationUnavailable {
                reason: "permission denied".into(),
            },

            CoreError::PositionUnavailable => CliError::LocationUnavailable {
                reason: "no position fix yet".into(),
            },

            CoreError::InvalidTransition { action, state } => CliError::Validation {
                field: "action".into(),
                reason: format!("cannot {action} while the panel is {state}"),
            },

            CoreError::InvalidRadius { index, len } => CliError::Validation {
                field: "radius-index".into(),
                reason: format!("{index} is out of range (0..{len})"),
            },

            CoreError::Bridge(e) => CliError::Validation {
                field: "renderer message".into(),
                reason: e.to_string(),
            },

            CoreError::Catalog { message } => CliError::Validation {
                field: "catalog".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile, token } => CliError::NoCredentials {
                profile,
                token: token.into(),
            },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::AuthExpired {
                    message: "token expired".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::Network {
                    reason: "refused".into(),
                    status: None,
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout, exit_code::TIMEOUT),
            (CoreError::PermissionDenied, exit_code::PERMISSION),
            (
                CoreError::InvalidRadius { index: 9, len: 6 },
                exit_code::USAGE,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }
}
