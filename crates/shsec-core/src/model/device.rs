// ── Device domain types ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Status key reported in `status_open` while a contact is open.
pub const STATUS_OPEN: &str = "device_status.dc_open";

/// Device kind, normalized from the vendor `type` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    DoorContact,
    Keypad,
    MotionDetector,
    IpCamera,
    /// Anything else, with the raw vendor key.
    Other(String),
}

impl DeviceType {
    pub fn from_vendor(raw: &str) -> Self {
        match raw {
            "device_type.door_contact" => Self::DoorContact,
            "device_type.keypad" => Self::Keypad,
            "device_type.pir" => Self::MotionDetector,
            "device_type.ipcam" => Self::IpCamera,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Human-readable model name. Unknown types show their raw key.
    pub fn display_name(&self) -> &str {
        match self {
            Self::DoorContact => "Door contact",
            Self::Keypad => "Keypad",
            Self::MotionDetector => "Motion detector",
            Self::IpCamera => "IP camera",
            Self::Other(raw) => raw,
        }
    }

    /// Binary sensor class, for the types that act as one.
    pub fn sensor_class(&self) -> Option<SensorClass> {
        match self {
            Self::DoorContact => Some(SensorClass::Door),
            Self::MotionDetector => Some(SensorClass::Motion),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What a binary sensor detects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorClass {
    Door,
    Motion,
}

/// One device as of the last poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub status_open: Vec<String>,
    pub status_motion: Option<String>,
    /// Fields the model does not interpret (battery, rssi, tamper, ...).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Device {
    /// Open/motion state: the first `status_open` entry wins, then the
    /// motion flag. `None` when the device reports neither.
    pub fn is_on(&self) -> Option<bool> {
        if let Some(first) = self.status_open.first() {
            return Some(first == STATUS_OPEN);
        }
        self.status_motion.as_deref().map(|m| m == "1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(status_open: &[&str], status_motion: Option<&str>) -> Device {
        Device {
            id: "1".into(),
            name: "test".into(),
            device_type: DeviceType::DoorContact,
            status_open: status_open.iter().map(|s| (*s).to_owned()).collect(),
            status_motion: status_motion.map(str::to_owned),
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn vendor_types_translate() {
        assert_eq!(
            DeviceType::from_vendor("device_type.pir"),
            DeviceType::MotionDetector
        );
        assert_eq!(
            DeviceType::from_vendor("device_type.ipcam").display_name(),
            "IP camera"
        );
        let siren = DeviceType::from_vendor("device_type.siren");
        assert_eq!(siren.display_name(), "device_type.siren");
        assert_eq!(siren.sensor_class(), None);
    }

    #[test]
    fn only_contacts_and_pirs_are_sensors() {
        assert_eq!(
            DeviceType::DoorContact.sensor_class(),
            Some(SensorClass::Door)
        );
        assert_eq!(
            DeviceType::MotionDetector.sensor_class(),
            Some(SensorClass::Motion)
        );
        assert_eq!(DeviceType::Keypad.sensor_class(), None);
        assert_eq!(SensorClass::Motion.to_string(), "motion");
    }

    #[test]
    fn first_open_status_decides() {
        assert_eq!(device(&[STATUS_OPEN], None).is_on(), Some(true));
        assert_eq!(
            device(&["device_status.dc_close", STATUS_OPEN], Some("1")).is_on(),
            Some(false)
        );
    }

    #[test]
    fn motion_flag_is_the_fallback() {
        assert_eq!(device(&[], Some("1")).is_on(), Some(true));
        assert_eq!(device(&[], Some("0")).is_on(), Some(false));
        assert_eq!(device(&[], None).is_on(), None);
    }
}
