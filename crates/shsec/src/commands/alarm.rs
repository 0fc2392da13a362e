//! Arm / arm-home / disarm.

use std::io::IsTerminal;

use serde_json::json;

use shsec_core::{Command as CoreCommand, CommandResult, Coordinator, CoordinatorConfig};

use crate::cli::{GlobalOpts, ModeArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Copy)]
pub enum Action {
    ArmAway,
    ArmHome,
    Disarm,
}

impl Action {
    fn command(self, area: String, code: Option<String>) -> CoreCommand {
        match self {
            Self::ArmAway => CoreCommand::ArmAway { area, code },
            Self::ArmHome => CoreCommand::ArmHome { area, code },
            Self::Disarm => CoreCommand::Disarm { area, code },
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::ArmAway => "arm",
            Self::ArmHome => "arm home",
            Self::Disarm => "disarm",
        }
    }
}

/// `--code`, or an interactive prompt when stdin is a terminal.
fn resolve_code(code: Option<String>) -> Result<Option<String>, CliError> {
    if code.is_some() || !std::io::stdin().is_terminal() {
        return Ok(code);
    }
    let entered = rpassword::prompt_password("Panel code: ")?;
    Ok(Some(entered))
}

pub async fn handle(
    config: CoordinatorConfig,
    action: Action,
    args: ModeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let code = resolve_code(args.code)?;
    let area = args.area;
    let cmd = action.command(area.clone(), code);

    let result = Coordinator::oneshot(config, |c| async move { c.execute(cmd).await }).await?;

    let ack = match result {
        CommandResult::Acknowledged(value) => value,
        CommandResult::Ok => serde_json::Value::Null,
    };

    if !global.quiet {
        eprintln!("✓ {} requested for area {area}", action.verb());
    }

    let view = json!({ "area": area, "action": action.verb(), "ack": ack });
    let out = output::render_single(&global.output, &view, |_| String::new(), |_| area.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
