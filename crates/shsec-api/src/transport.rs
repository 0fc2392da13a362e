// Shared transport configuration for building reqwest::Client instances
// and resolving the vendor's REST and push endpoints.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Production REST root. Paths such as `auth/login` are joined onto it,
/// so the trailing slash matters.
pub const DEFAULT_REST_BASE: &str = "https://smarthomesec.bydemes.com/REST/v2/";

/// Production push endpoint (socket.io over a raw WebSocket).
pub const DEFAULT_PUSH_BASE: &str = "wss://smarthomesec.bydemes.com/ws/socket.io/";

const USER_AGENT: &str = concat!("shsec/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate. Only useful against test doubles.
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// No cookie store is attached: the vendor expects the session cookie
    /// to be assembled by hand on every request.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// Where the REST API and the push channel live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// REST root, always ending in `/`.
    pub rest_base: Url,
    /// Push channel URL without query parameters.
    pub push_base: Url,
}

impl Endpoints {
    /// Build endpoints from arbitrary base URLs, normalizing the REST root
    /// so relative joins land under it.
    pub fn new(rest_base: &str, push_base: &str) -> Result<Self, Error> {
        let rest = if rest_base.ends_with('/') {
            rest_base.to_owned()
        } else {
            format!("{rest_base}/")
        };
        Ok(Self {
            rest_base: Url::parse(&rest)?,
            push_base: Url::parse(push_base)?,
        })
    }

    /// Full URL for a REST path such as `panel/cycle`.
    pub fn rest_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.rest_base.join(path.trim_start_matches('/'))?)
    }

    /// Push channel URL carrying the session token.
    pub fn push_url(&self, token: &str) -> Url {
        let mut url = self.push_base.clone();
        url.query_pairs_mut()
            .append_pair("token", token)
            .append_pair("transport", "websocket");
        url
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            rest_base: Url::parse(DEFAULT_REST_BASE).expect("default REST base is a valid URL"),
            push_base: Url::parse(DEFAULT_PUSH_BASE).expect("default push base is a valid URL"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_point_at_vendor() {
        let ep = Endpoints::default();
        assert_eq!(
            ep.rest_url("auth/login").unwrap().as_str(),
            "https://smarthomesec.bydemes.com/REST/v2/auth/login"
        );
    }

    #[test]
    fn rest_base_without_trailing_slash_is_normalized() {
        let ep = Endpoints::new("http://127.0.0.1:9000/REST/v2", "ws://127.0.0.1:9000/ws/").unwrap();
        assert_eq!(
            ep.rest_url("/panel/cycle").unwrap().as_str(),
            "http://127.0.0.1:9000/REST/v2/panel/cycle"
        );
    }

    #[test]
    fn push_url_carries_token_and_transport() {
        let ep = Endpoints::default();
        let url = ep.push_url("abc123");
        assert_eq!(
            url.as_str(),
            "wss://smarthomesec.bydemes.com/ws/socket.io/?token=abc123&transport=websocket"
        );
    }
}
