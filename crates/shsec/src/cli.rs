//! Clap derive structures for the `shsec` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// shsec -- command-line host for SmartHomeSec alarm installations
#[derive(Debug, Parser)]
#[command(
    name = "shsec",
    version,
    about = "Monitor and control SmartHomeSec alarm panels from the command line",
    long_about = "Talks to the SmartHomeSec cloud: polls door contacts, motion\n\
        detectors and alarm areas, arms and disarms areas, and follows the\n\
        push channel for near-real-time updates.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Installation profile to use
    #[arg(long, short = 'p', env = "SHSEC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Account e-mail (overrides profile)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Account password (overrides profile and keyring)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SHSEC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SHSEC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show installation summary
    #[command(alias = "st")]
    Status,

    /// List door contacts and motion detectors
    #[command(alias = "sensor", alias = "s")]
    Sensors,

    /// List alarm panels (one per configured area)
    #[command(alias = "panel")]
    Panels,

    /// Arm an area (away)
    Arm(ModeArgs),

    /// Arm an area in home mode
    Home(ModeArgs),

    /// Disarm an area
    Disarm(ModeArgs),

    /// Stay connected and print every update
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Alarm Commands ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ModeArgs {
    /// Area id
    #[arg(long, short = 'a', default_value = "1")]
    pub area: String,

    /// Panel code (prompted for when omitted on a terminal)
    #[arg(long, short = 'c', env = "SHSEC_CODE", hide_env_values = true)]
    pub code: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Poll only; do not open the push channel
    #[arg(long)]
    pub no_push: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a profile with guided setup and a connection test
    Init(InitArgs),

    /// Show current configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store a profile's password in the system keyring
    SetPassword {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Profile name
    #[arg(long)]
    pub profile_name: Option<String>,

    /// Installation name (used in alarm panel names)
    #[arg(long)]
    pub name: Option<String>,

    /// REST root override, e.g. for a staging deployment
    #[arg(long)]
    pub rest_url: Option<String>,

    /// Where to keep the password
    #[arg(long, value_enum)]
    pub store: Option<PasswordStore>,

    /// Save without testing the login first
    #[arg(long)]
    pub skip_test: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PasswordStore {
    /// System keyring
    Keyring,
    /// Plaintext in the config file
    Config,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
