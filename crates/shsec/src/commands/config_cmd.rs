//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use shsec_config::{Overrides, Profile};
use shsec_core::{Coordinator, CoordinatorConfig};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, InitArgs, PasswordStore};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Use the given value, or ask for it.
fn value_or_prompt(
    value: Option<String>,
    prompt: &str,
    default: Option<&str>,
) -> Result<String, CliError> {
    if let Some(v) = value {
        return Ok(v);
    }
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(d) = default {
        input = input.default(d.to_owned());
    }
    input.interact_text().map_err(prompt_err)
}

fn require(field: &str, value: &str) -> Result<(), CliError> {
    if value.trim().is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(())
}

/// Log in once with the candidate profile. Any failure to reach or log
/// into the account is reported as "cannot connect".
async fn test_connection(config: CoordinatorConfig, profile_name: &str) -> Result<(), CliError> {
    let url = config.rest_url.to_string();
    match Coordinator::oneshot(config, |_| async { Ok(()) }).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_connect_failure() => Err(CliError::CannotConnect {
            url,
            reason: e.to_string(),
        }),
        Err(e) => Err(CliError::from_core(e, profile_name)),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init) => handle_init(init, global).await,

        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            for profile in cfg.profiles.values_mut() {
                if profile.password.is_some() {
                    profile.password = Some(REDACTED.into());
                }
            }
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| format!("{c:#?}"),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: shsec config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            cfg.profile(&name)?;
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            cfg.profile(&profile_name)?;

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            require("password", &secret)?;

            shsec_config::store_password(&profile_name, &secret)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

async fn handle_init(args: InitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();
    let mut cfg = config::load_config_or_default();

    if !global.quiet {
        eprintln!("✨ SmartHomeSec -- configuration wizard");
        eprintln!("   Config path: {}\n", config_path.display());
    }

    // 1. Profile, installation name, account
    let profile_name = value_or_prompt(
        args.profile_name.or_else(|| global.profile.clone()),
        "Profile name",
        Some("default"),
    )?;
    let name = value_or_prompt(args.name, "Installation name", Some("SmartHomeSec"))?;
    let username = value_or_prompt(global.username.clone(), "Account e-mail", None)?;
    let password = match global.password.clone() {
        Some(pw) => pw,
        None => rpassword::prompt_password("Password: ").map_err(prompt_err)?,
    };
    require("name", &name)?;
    require("username", &username)?;
    require("password", &password)?;

    // 2. One profile per installation + account
    if let Some((existing, _)) = cfg
        .profiles
        .iter()
        .find(|(_, p)| p.name == name && p.username.as_deref() == Some(username.as_str()))
    {
        return Err(CliError::AlreadyConfigured {
            profile: existing.clone(),
            name,
            username,
        });
    }

    let mut profile = Profile {
        name: name.clone(),
        username: Some(username),
        rest_url: args.rest_url,
        ..Profile::default()
    };

    // 3. Connection test
    if args.skip_test {
        tracing::debug!("connection test skipped");
    } else {
        let overrides = Overrides {
            password: Some(SecretString::from(password.clone())),
            timeout: global.timeout,
            ..Overrides::default()
        };
        let candidate = shsec_config::build_coordinator_config(&profile, &profile_name, &overrides)?;
        test_connection(candidate, &profile_name).await?;
        if !global.quiet {
            eprintln!("   ✓ Logged in");
        }
    }

    // 4. Password storage
    let store = match args.store {
        Some(store) => store,
        None => {
            let choices = &["Store in system keyring (recommended)", "Save to config file (plaintext)"];
            let selection = Select::new()
                .with_prompt("Where to store the password?")
                .items(choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;
            if selection == 0 {
                PasswordStore::Keyring
            } else {
                PasswordStore::Config
            }
        }
    };
    match store {
        PasswordStore::Keyring => {
            shsec_config::store_password(&profile_name, &password)?;
            if !global.quiet {
                eprintln!("   ✓ Password stored in system keyring");
            }
        }
        PasswordStore::Config => profile.password = Some(password),
    }

    // 5. Write config
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let path = config::save_config(&cfg)?;

    if !global.quiet {
        eprintln!("\n✓ Configuration written to {}", path.display());
        eprintln!("  Active profile: {profile_name} ({name})");
        eprintln!("\n  Test it: shsec status");
    }
    Ok(())
}
