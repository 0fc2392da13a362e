//! Shared configuration for the SmartHomeSec CLI.
//!
//! TOML profiles, credential resolution (flag + env + plaintext + keyring),
//! and translation to `shsec_core::CoordinatorConfig`. Core never sees
//! these types; it receives a pre-built `CoordinatorConfig`.

use std::collections::BTreeMap;
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
use url::Url;

use shsec_core::{CoordinatorConfig, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "shsec";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "SHSEC_CONFIG";

pub const USERNAME_ENV: &str = "SHSEC_USERNAME";
pub const PASSWORD_ENV: &str = "SHSEC_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named installation profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.available_profiles(),
            })
    }

    /// Comma-separated profile names, or `(none)`.
    pub fn available_profiles(&self) -> String {
        if self.profiles.is_empty() {
            "(none)".into()
        } else {
            self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
        }
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
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
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
    30
}

/// A named installation profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Installation name, shown in alarm panel names.
    #[serde(default = "default_name")]
    pub name: String,

    /// Account e-mail.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring).
    pub password: Option<String>,

    /// REST root override.
    pub rest_url: Option<String>,

    /// Push channel endpoint override.
    pub push_url: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification (test doubles only).
    pub insecure: Option<bool>,

    /// HTTP timeout in seconds.
    pub timeout: Option<u64>,

    /// Seconds between polls.
    pub refresh_interval: Option<u64>,

    /// Keep the push channel open.
    pub push: Option<bool>,

    /// Area ids exposed as alarm panels.
    pub areas: Option<Vec<String>>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: default_name(),
            username: None,
            password: None,
            rest_url: None,
            push_url: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            refresh_interval: None,
            push: None,
            areas: None,
        }
    }
}

fn default_name() -> String {
    "SmartHomeSec".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `SHSEC_CONFIG`, then XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "shsec", "shsec").map_or_else(
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
    p.push("shsec");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment. A missing file yields defaults.
///
/// Nested keys use a double underscore: `SHSEC_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SHSEC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Resolve the active profile name: explicit choice, then the config's
/// default, then `default`.
pub fn active_profile_name(explicit: Option<&str>, config: &Config) -> String {
    explicit
        .map(str::to_owned)
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

// ── Credential resolution ───────────────────────────────────────────

/// Values given on the command line; they win over everything else.
#[derive(Debug, Default)]
pub struct Overrides {
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub timeout: Option<u64>,
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))?;
    entry.set_password(password)?;
    Ok(())
}

/// Resolve username + password for a profile.
///
/// Username: override, profile, `SHSEC_USERNAME`. Password: override,
/// `SHSEC_PASSWORD`, plaintext in the profile, system keyring.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
    overrides: &Overrides,
) -> Result<(String, SecretString), ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = overrides
        .username
        .clone()
        .or_else(|| profile.username.clone())
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .filter(|u| !u.is_empty())
        .ok_or_else(no_credentials)?;

    if let Some(ref pw) = overrides.password {
        return Ok((username, pw.clone()));
    }

    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok((username, SecretString::from(pw)));
    }

    if let Some(ref pw) = profile.password {
        return Ok((username, SecretString::from(pw.clone())));
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok((username, SecretString::from(pw)));
        }
    }

    Err(no_credentials())
}

// ── Translation to core ─────────────────────────────────────────────

/// Build a `CoordinatorConfig` from a profile, with no overrides.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<CoordinatorConfig, ConfigError> {
    build_coordinator_config(profile, profile_name, &Overrides::default())
}

/// Build a `CoordinatorConfig` from a profile plus command-line overrides.
///
/// This is the single boundary where config types cross into core types.
pub fn build_coordinator_config(
    profile: &Profile,
    profile_name: &str,
    overrides: &Overrides,
) -> Result<CoordinatorConfig, ConfigError> {
    if profile.name.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "name".into(),
            reason: "installation name cannot be empty".into(),
        });
    }

    let (username, password) = resolve_credentials(profile, profile_name, overrides)?;
    let defaults = CoordinatorConfig::default();

    let rest_url = parse_url("rest_url", profile.rest_url.as_deref())?.unwrap_or(defaults.rest_url);
    let push_url = parse_url("push_url", profile.push_url.as_deref())?.unwrap_or(defaults.push_url);

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let alarm_areas = match &profile.areas {
        Some(areas) if areas.is_empty() => {
            return Err(ConfigError::Validation {
                field: "areas".into(),
                reason: "at least one area is required".into(),
            });
        }
        Some(areas) => areas.clone(),
        None => defaults.alarm_areas,
    };

    let timeout = overrides
        .timeout
        .or(profile.timeout)
        .map_or(defaults.timeout, Duration::from_secs);

    Ok(CoordinatorConfig {
        name: profile.name.clone(),
        username,
        password,
        rest_url,
        push_url,
        tls,
        timeout,
        refresh_interval_secs: profile
            .refresh_interval
            .unwrap_or(defaults.refresh_interval_secs),
        push_enabled: profile.push.unwrap_or(defaults.push_enabled),
        alarm_areas,
        ..defaults
    })
}

fn parse_url(field: &str, raw: Option<&str>) -> Result<Option<Url>, ConfigError> {
    raw.map(|s| {
        s.parse::<Url>().map_err(|_| ConfigError::Validation {
            field: field.into(),
            reason: format!("invalid URL: {s}"),
        })
    })
    .transpose()
}
