use thiserror::Error;

/// Top-level error type for the `shsec-api` crate.
///
/// Covers every failure mode of the SmartHomeSec cloud: login, REST
/// transport, payload rejection, and the push channel. `shsec-core` maps
/// these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, malformed login response, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── REST ────────────────────────────────────────────────────────
    /// Non-200 response that is not an auth or payload problem, or an
    /// unauthorized response that survived the re-login budget.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// State-changing call rejected with HTTP 400 (bad pincode, invalid
    /// area, etc.). Never retried.
    #[error("Request rejected by panel: {message}")]
    Security { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Push channel ────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// An established WebSocket went away: closed by the server, or
    /// dropped by the transport (code 1006).
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Security { .. } => Some(400),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
