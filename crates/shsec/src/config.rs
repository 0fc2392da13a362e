//! CLI-side config resolution: profile selection plus `GlobalOpts`
//! overrides on top of `shsec_config`.

use secrecy::SecretString;

use shsec_config::{Config, Overrides, Profile};
use shsec_core::CoordinatorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use shsec_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from `--profile` and the config file.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    shsec_config::active_profile_name(global.profile.as_deref(), config)
}

/// Command-line values that win over the profile.
pub fn overrides(global: &GlobalOpts) -> Overrides {
    Overrides {
        username: global.username.clone(),
        password: global.password.clone().map(SecretString::from),
        timeout: global.timeout,
    }
}

/// Build a `CoordinatorConfig` from the config file, profile, and CLI
/// overrides. Returns the profile name alongside for error messages.
pub fn build_coordinator_config(
    global: &GlobalOpts,
) -> Result<(CoordinatorConfig, String), CliError> {
    let cfg = shsec_config::load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        let config = shsec_config::build_coordinator_config(profile, &profile_name, &overrides(global))?;
        return Ok((config, profile_name));
    }

    // An explicitly requested profile must exist
    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: cfg.available_profiles(),
        });
    }

    // No profile -- try flags / env vars alone
    if global.username.is_none() && std::env::var(shsec_config::USERNAME_ENV).is_err() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }

    let config =
        shsec_config::build_coordinator_config(&Profile::default(), &profile_name, &overrides(global))?;
    Ok((config, profile_name))
}
