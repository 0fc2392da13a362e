// ── Alarm area domain types ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Arming mode of an area as the panel reports it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlarmMode {
    Disarm,
    Arm,
    Home,
    Triggered,
    Unknown,
}

impl AlarmMode {
    /// Modes a user may request. `triggered` and unknown modes are
    /// observed only.
    pub fn is_settable(self) -> bool {
        matches!(self, Self::Disarm | Self::Arm | Self::Home)
    }

    pub fn alarm_state(self) -> Option<AlarmState> {
        match self {
            Self::Disarm => Some(AlarmState::Disarmed),
            Self::Arm => Some(AlarmState::ArmedAway),
            Self::Home => Some(AlarmState::ArmedHome),
            Self::Triggered => Some(AlarmState::Triggered),
            Self::Unknown => None,
        }
    }
}

/// Alarm panel state exposed to consumers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlarmState {
    Disarmed,
    ArmedAway,
    ArmedHome,
    Triggered,
}

/// One alarm area as of the last poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    /// Area id, always in string form.
    pub id: String,
    pub mode: AlarmMode,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn modes_map_to_states() {
        assert_eq!(AlarmMode::Disarm.alarm_state(), Some(AlarmState::Disarmed));
        assert_eq!(AlarmMode::Arm.alarm_state(), Some(AlarmState::ArmedAway));
        assert_eq!(AlarmMode::Home.alarm_state(), Some(AlarmState::ArmedHome));
        assert_eq!(
            AlarmMode::Triggered.alarm_state(),
            Some(AlarmState::Triggered)
        );
        assert_eq!(AlarmMode::Unknown.alarm_state(), None);
    }

    #[test]
    fn state_names_are_snake_case() {
        assert_eq!(AlarmState::ArmedAway.to_string(), "armed_away");
        assert_eq!("home".parse::<AlarmMode>().unwrap(), AlarmMode::Home);
        assert!(!AlarmMode::Triggered.is_settable());
    }
}
