//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use shsec_config::ConfigError;
use shsec_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot connect to SmartHomeSec at {url}")]
    #[diagnostic(
        code(shsec::cannot_connect),
        help(
            "{reason}\n\
             Check your network connection, or the rest_url of the profile."
        )
    )]
    CannotConnect { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(shsec::auth_failed),
        help(
            "Verify the account e-mail and password.\n\
             Run: shsec config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(shsec::no_credentials),
        help(
            "Configure credentials with: shsec config init\n\
             Or set SHSEC_USERNAME and SHSEC_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(shsec::not_found),
        help("Run: shsec {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Profile for {username} ({name}) is already configured as '{profile}'")]
    #[diagnostic(code(shsec::already_configured))]
    AlreadyConfigured {
        profile: String,
        name: String,
        username: String,
    },

    // ── Panel ────────────────────────────────────────────────────────
    #[error("Panel rejected the request: {message}")]
    #[diagnostic(
        code(shsec::rejected),
        help("Check the panel code; the area state was not changed.")
    )]
    Rejected { message: String },

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(shsec::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(shsec::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(shsec::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: shsec config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(shsec::no_config),
        help(
            "Create one with: shsec config init\n\
             Or pass --username and --password.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(shsec::config))]
    Config(Box<ConfigError>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(shsec::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CannotConnect { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::AlreadyConfigured { .. } => exit_code::CONFLICT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Like `From<CoreError>`, but naming the profile in auth failures.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: profile.into(),
                message,
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::CannotConnect { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::NotConnected => CliError::CannotConnect {
                url: "(disconnected)".into(),
                reason: "The session is not connected".into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::RefreshFailed(inner) => (*inner).into(),

            CoreError::AreaNotFound { area } => CliError::NotFound {
                resource_type: "area".into(),
                identifier: area,
                list_command: "panels".into(),
            },

            CoreError::Security { message } => CliError::Rejected { message },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { status, message } => CliError::ApiError {
                code: status.to_string(),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}
