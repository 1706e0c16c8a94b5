// ── Core error types ──
//
// User-facing errors from sitefinder-core. Consumers never see raw HTTP or
// JSON failures; the `From<sitefinder_api::Error>` impl folds them into the
// categories the UI actually distinguishes.

use thiserror::Error;

use crate::bridge::BridgeError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote service errors ────────────────────────────────────────
    /// Transport failure or non-2xx response.
    #[error("Network error: {reason}")]
    Network { reason: String, status: Option<u16> },

    /// The request outlived the configured transport timeout.
    #[error("Request timed out")]
    Timeout,

    /// The backend rejected the session token. The token must be cleared
    /// and the user re-authenticated.
    #[error("Session expired: {message}")]
    AuthExpired { message: String },

    /// The service answered 2xx but reported failure in its envelope.
    #[error("API error: {message}")]
    Api { message: String, status: Option<u16> },

    // ── Location ─────────────────────────────────────────────────────
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Current position is not known yet")]
    PositionUnavailable,

    // ── State machine and inputs ─────────────────────────────────────
    #[error("Cannot {action} while the panel is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Radius index {index} is out of range (0..{len})")]
    InvalidRadius { index: usize, len: usize },

    #[error("Renderer message rejected: {0}")]
    Bridge(#[from] BridgeError),

    // ── Startup ──────────────────────────────────────────────────────
    #[error("Site catalog error: {message}")]
    Catalog { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Transport-level failures: unreachable, timed out, or a non-2xx reply.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout)
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sitefinder_api::Error> for CoreError {
    fn from(err: sitefinder_api::Error) -> Self {
        match err {
            sitefinder_api::Error::Authentication { message } => CoreError::AuthExpired { message },
            sitefinder_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::Network {
                        reason: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            sitefinder_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sitefinder_api::Error::Tls(msg) => CoreError::Network {
                reason: format!("TLS error: {msg}"),
                status: None,
            },
            // A 2xx with `success: false` is an application-level refusal.
            sitefinder_api::Error::Api { status, message } if (200..300).contains(&status) => {
                CoreError::Api {
                    message,
                    status: Some(status),
                }
            }
            sitefinder_api::Error::Api { status, message } => CoreError::Network {
                reason: format!("HTTP {status}: {message}"),
                status: Some(status),
            },
            sitefinder_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
