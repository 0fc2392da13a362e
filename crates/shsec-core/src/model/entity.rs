// ── Entity views ──
//
// Read models a host (CLI, dashboard, automation) renders directly:
// one binary sensor per door contact or motion detector, and one alarm
// panel per configured area. Built from a snapshot, never stored.

use serde::Serialize;
use strum::{Display, EnumString};

use super::alarm::{AlarmMode, AlarmState, Area};
use super::device::{Device, SensorClass};

pub const MANUFACTURER: &str = "SmartHomeSec";

/// State label for an entity whose data is stale.
pub const STATE_UNAVAILABLE: &str = "unavailable";
/// State label when the device reports nothing usable.
pub const STATE_UNKNOWN: &str = "unknown";

// ── Binary sensor ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BinarySensor {
    /// Stable id; the vendor device id.
    pub unique_id: String,
    /// `"<device_id> - <device name>"`.
    pub name: String,
    pub device_name: String,
    /// Human-readable model, e.g. "Door contact".
    pub model: String,
    pub manufacturer: &'static str,
    pub class: SensorClass,
    pub is_on: Option<bool>,
    pub available: bool,
}

impl BinarySensor {
    /// `None` for devices that are not binary sensors.
    pub fn from_device(device: &Device, available: bool) -> Option<Self> {
        let class = device.device_type.sensor_class()?;
        Some(Self {
            unique_id: device.id.clone(),
            name: format!("{} - {}", device.id, device.name),
            device_name: device.name.clone(),
            model: device.device_type.display_name().to_owned(),
            manufacturer: MANUFACTURER,
            class,
            is_on: device.is_on(),
            available,
        })
    }

    /// `"on"`, `"off"`, `"unknown"` or `"unavailable"`.
    pub fn state(&self) -> &'static str {
        match (self.available, self.is_on) {
            (false, _) => STATE_UNAVAILABLE,
            (true, Some(true)) => "on",
            (true, Some(false)) => "off",
            (true, None) => STATE_UNKNOWN,
        }
    }
}

// ── Alarm panel ──────────────────────────────────────────────────────

/// Format of the code a user enters to arm or disarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CodeFormat {
    Number,
}

/// Arming actions a panel accepts besides disarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlarmFeature {
    ArmHome,
    ArmAway,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlarmPanel {
    /// `"smarthomesec_<installation>_<area>"`.
    pub unique_id: String,
    /// `"<installation> <area>"`.
    pub name: String,
    pub area: String,
    pub mode: AlarmMode,
    pub state: Option<AlarmState>,
    pub code_arm_required: bool,
    pub code_format: CodeFormat,
    pub supported_features: Vec<AlarmFeature>,
    pub manufacturer: &'static str,
    pub available: bool,
}

impl AlarmPanel {
    pub fn from_area(installation: &str, area: &Area, available: bool) -> Self {
        Self {
            unique_id: format!("smarthomesec_{installation}_{}", area.id),
            name: format!("{installation} {}", area.id),
            area: area.id.clone(),
            mode: area.mode,
            state: area.mode.alarm_state(),
            code_arm_required: true,
            code_format: CodeFormat::Number,
            supported_features: vec![AlarmFeature::ArmHome, AlarmFeature::ArmAway],
            manufacturer: MANUFACTURER,
            available,
        }
    }

    /// State label, e.g. `"armed_away"`.
    pub fn state_label(&self) -> &'static str {
        match (self.available, self.state) {
            (false, _) => STATE_UNAVAILABLE,
            (true, Some(state)) => state.into(),
            (true, None) => STATE_UNKNOWN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::{DeviceType, STATUS_OPEN};

    fn contact(open: bool) -> Device {
        Device {
            id: "12".into(),
            name: "Front door".into(),
            device_type: DeviceType::DoorContact,
            status_open: vec![if open {
                STATUS_OPEN.into()
            } else {
                "device_status.dc_close".into()
            }],
            status_motion: None,
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn open_contact_reports_on() {
        let sensor = BinarySensor::from_device(&contact(true), true).unwrap_or_else(|| {
            panic!("door contact must be a binary sensor");
        });
        assert_eq!(sensor.name, "12 - Front door");
        assert_eq!(sensor.model, "Door contact");
        assert_eq!(sensor.class, SensorClass::Door);
        assert_eq!(sensor.state(), "on");
    }

    #[test]
    fn stale_sensor_is_unavailable() {
        let sensor = BinarySensor::from_device(&contact(false), false);
        assert_eq!(sensor.map(|s| s.state()), Some(STATE_UNAVAILABLE));
    }

    #[test]
    fn keypad_is_not_a_sensor() {
        let mut keypad = contact(false);
        keypad.device_type = DeviceType::Keypad;
        assert!(BinarySensor::from_device(&keypad, true).is_none());
    }

    #[test]
    fn panel_naming_and_state() {
        let area = Area {
            id: "1".into(),
            mode: AlarmMode::Home,
            attributes: serde_json::Map::new(),
        };
        let panel = AlarmPanel::from_area("Casa", &area, true);
        assert_eq!(panel.unique_id, "smarthomesec_Casa_1");
        assert_eq!(panel.name, "Casa 1");
        assert_eq!(panel.state_label(), "armed_home");
        assert!(panel.code_arm_required);
        assert_eq!(panel.code_format, CodeFormat::Number);
    }

    #[test]
    fn unknown_mode_has_no_state() {
        let area = Area {
            id: "2".into(),
            mode: AlarmMode::Unknown,
            attributes: serde_json::Map::new(),
        };
        let panel = AlarmPanel::from_area("Casa", &area, true);
        assert_eq!(panel.state, None);
        assert_eq!(panel.state_label(), STATE_UNKNOWN);
    }
}
