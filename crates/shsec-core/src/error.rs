// ── Core error types ──
//
// User-facing errors from shsec-core. Consumers branch on the variant,
// not on HTTP details. The `From<shsec_api::Error>` impl translates
// transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to SmartHomeSec at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Poll errors ──────────────────────────────────────────────────
    #[error("Refresh failed: {0}")]
    RefreshFailed(#[source] Box<CoreError>),

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Area not found: {area}")]
    AreaNotFound { area: String },

    #[error("Rejected by panel: {message}")]
    Security { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The innermost cause, looking through [`RefreshFailed`](Self::RefreshFailed).
    pub fn root(&self) -> &CoreError {
        match self {
            Self::RefreshFailed(inner) => inner.root(),
            other => other,
        }
    }

    /// Whether this failure means the account could not be reached or
    /// logged into (the "cannot connect" case of initial setup).
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self.root(),
            Self::AuthenticationFailed { .. }
                | Self::ConnectionFailed { .. }
                | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<shsec_api::Error> for CoreError {
    fn from(err: shsec_api::Error) -> Self {
        match err {
            shsec_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            shsec_api::Error::Api { status, message } => CoreError::Api { status, message },
            shsec_api::Error::Security { message } => CoreError::Security { message },
            shsec_api::Error::Transport(ref e) => {
                let url = e
                    .url()
                    .map(|u| format!("{}://{}", u.scheme(), u.host_str().unwrap_or_default()))
                    .unwrap_or_else(|| "<unknown>".into());
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if let Some(status) = e.status() {
                    CoreError::Api {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else {
                    CoreError::ConnectionFailed {
                        url,
                        reason: e.to_string(),
                    }
                }
            }
            shsec_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            shsec_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            shsec_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Push channel connection failed: {reason}"),
            },
            shsec_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Push channel closed (code {code}): {reason}"),
            },
            shsec_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected response: {message}"))
            }
        }
    }
}
