// ── Runtime coordinator configuration ──
//
// Describes *how* to reach the SmartHomeSec cloud and how often to poll.
// Carries credential data but never touches disk; the CLI builds a
// `CoordinatorConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use shsec_api::transport::{DEFAULT_PUSH_BASE, DEFAULT_REST_BASE};

/// Areas surfaced as alarm panels when nothing else is configured.
pub const DEFAULT_ALARM_AREAS: &[&str] = &["1"];

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). The vendor cloud has a public certificate.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Only for test doubles.
    DangerAcceptInvalid,
}

/// Configuration for one SmartHomeSec installation.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Installation name; used in alarm panel names and unique ids.
    pub name: String,
    pub username: String,
    pub password: SecretString,
    /// REST root (e.g. `https://smarthomesec.bydemes.com/REST/v2/`).
    pub rest_url: Url,
    /// Push channel endpoint, without query parameters.
    pub push_url: Url,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Seconds between scheduled polls. 0 = only on demand.
    pub refresh_interval_secs: u64,
    /// Upper bound for a single poll, login retries included.
    pub refresh_timeout: Duration,
    /// Keep a push channel open and refresh on its events.
    pub push_enabled: bool,
    pub push_ping_interval: Duration,
    pub push_reconnect_delay: Duration,
    /// Area ids exposed as alarm panels.
    pub alarm_areas: Vec<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: "SmartHomeSec".into(),
            username: String::new(),
            password: SecretString::from(String::new()),
            rest_url: Url::parse(DEFAULT_REST_BASE).expect("default REST URL is valid"),
            push_url: Url::parse(DEFAULT_PUSH_BASE).expect("default push URL is valid"),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_interval_secs: 30,
            refresh_timeout: Duration::from_secs(10),
            push_enabled: true,
            push_ping_interval: Duration::from_secs(10),
            push_reconnect_delay: Duration::from_secs(10),
            alarm_areas: DEFAULT_ALARM_AREAS.iter().map(|&a| a.to_owned()).collect(),
        }
    }
}
