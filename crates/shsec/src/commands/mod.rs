//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod alarm;
pub mod config_cmd;
pub mod panels;
pub mod sensors;
pub mod status;
pub mod watch;

use shsec_core::CoordinatorConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a connection-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: CoordinatorConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(config, global).await,
        Command::Sensors => sensors::handle(config, global).await,
        Command::Panels => panels::handle(config, global).await,
        Command::Arm(args) => alarm::handle(config, alarm::Action::ArmAway, args, global).await,
        Command::Home(args) => alarm::handle(config, alarm::Action::ArmHome, args, global).await,
        Command::Disarm(args) => alarm::handle(config, alarm::Action::Disarm, args, global).await,
        Command::Watch(args) => watch::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled without a connection".into(),
        }),
    }
}
