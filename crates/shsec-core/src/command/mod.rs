// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The
// coordinator's command processor routes each variant to the panel.

use crate::error::CoreError;
use crate::model::AlarmMode;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All write operations against an installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Alarm operations ─────────────────────────────────────────────
    ArmAway { area: String, code: Option<String> },
    ArmHome { area: String, code: Option<String> },
    Disarm { area: String, code: Option<String> },

    // ── Data ─────────────────────────────────────────────────────────
    /// Poll now instead of waiting for the next interval.
    Refresh,
}

impl Command {
    /// Mode an alarm command requests, `None` for non-alarm commands.
    pub fn target_mode(&self) -> Option<AlarmMode> {
        match self {
            Self::ArmAway { .. } => Some(AlarmMode::Arm),
            Self::ArmHome { .. } => Some(AlarmMode::Home),
            Self::Disarm { .. } => Some(AlarmMode::Disarm),
            Self::Refresh => None,
        }
    }
}

/// Result of a command execution.
#[derive(Debug)]
pub enum CommandResult {
    Ok,
    /// Raw acknowledgement returned by the panel.
    Acknowledged(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_commands_target_panel_modes() {
        let arm = Command::ArmAway {
            area: "1".into(),
            code: Some("1234".into()),
        };
        let home = Command::ArmHome {
            area: "1".into(),
            code: None,
        };
        assert_eq!(arm.target_mode(), Some(AlarmMode::Arm));
        assert_eq!(home.target_mode(), Some(AlarmMode::Home));
        assert_eq!(Command::Refresh.target_mode(), None);
    }
}
