// Wire models for the SmartHomeSec REST API
//
// The panel is loose about scalar types: ids and areas arrive as numbers
// on some firmware and strings on others, and status fields may be null.
// Everything is normalized to strings at this boundary.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

// ── Panel status (`GET panel/cycle`) ────────────────────────────────

/// Envelope of `GET panel/cycle`.
#[derive(Debug, Deserialize)]
pub struct CycleResponse {
    pub data: PanelStatus,
}

/// Combined device + area snapshot returned by each poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_status: Vec<DeviceStatus>,
    /// Per-area alarm state. The vendor calls this list `model`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: Vec<AreaStatus>,
}

/// One device from `device_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(deserialize_with = "deserialize_id")]
    pub device_id: String,
    /// Vendor type key, e.g. `"device_type.door_contact"`.
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Open/closed status keys; the first entry is authoritative.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_open: Vec<String>,
    /// `"1"` while a motion detector reports motion.
    #[serde(default, deserialize_with = "deserialize_opt_scalar")]
    pub status_motion: Option<String>,
    /// Everything else the panel reports (battery, rssi, tamper, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One area from `model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaStatus {
    #[serde(deserialize_with = "deserialize_id")]
    pub area: String,
    pub mode: PanelMode,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Panel mode ──────────────────────────────────────────────────────

/// Arming mode as the panel names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelMode {
    Disarm,
    Arm,
    Home,
    Triggered,
    #[serde(other)]
    Unknown,
}

impl PanelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disarm => "disarm",
            Self::Arm => "arm",
            Self::Home => "home",
            Self::Triggered => "triggered",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PanelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Mode change (`POST panel/mode`) ─────────────────────────────────

/// Form-encoded body of `POST panel/mode`.
#[derive(Debug, Clone, Serialize)]
pub struct ModeForm {
    pub area: u32,
    pub pincode: u32,
    pub mode: PanelMode,
    pub format: u8,
}

impl ModeForm {
    pub fn new(area: u32, mode: PanelMode, pincode: u32) -> Self {
        Self {
            area,
            pincode,
            mode,
            format: 1,
        }
    }
}

// ── Deserialization helpers ─────────────────────────────────────────

/// Accept a string or an integer and yield its string form.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Like [`deserialize_id`] but tolerating `null`, missing and empty values.
fn deserialize_opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if s.is_empty() => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::Bool(b) => Ok(Some(if b { "1" } else { "0" }.to_owned())),
        _ => Ok(None),
    }
}

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cycle_response_normalizes_ids() {
        let body = json!({
            "data": {
                "device_status": [{
                    "device_id": 12,
                    "type": "device_type.door_contact",
                    "name": "Front door",
                    "status_open": ["device_status.dc_open"],
                    "status_motion": null,
                    "battery": "ok"
                }],
                "model": [{ "area": 1, "mode": "arm" }]
            }
        });

        let resp: CycleResponse = serde_json::from_value(body).unwrap();
        let device = &resp.data.device_status[0];
        assert_eq!(device.device_id, "12");
        assert_eq!(device.status_open, vec!["device_status.dc_open".to_string()]);
        assert!(device.status_motion.is_none());
        assert_eq!(device.extra["battery"], "ok");

        let area = &resp.data.model[0];
        assert_eq!(area.area, "1");
        assert_eq!(area.mode, PanelMode::Arm);
    }

    #[test]
    fn unknown_mode_does_not_fail_the_poll() {
        let area: AreaStatus = serde_json::from_value(json!({ "area": "2", "mode": "partial" })).unwrap();
        assert_eq!(area.mode, PanelMode::Unknown);
    }

    #[test]
    fn null_lists_become_empty() {
        let status: PanelStatus =
            serde_json::from_value(json!({ "device_status": null, "model": null })).unwrap();
        assert!(status.device_status.is_empty());
        assert!(status.model.is_empty());
    }

    #[test]
    fn motion_flag_accepts_numbers() {
        let device: DeviceStatus = serde_json::from_value(json!({
            "device_id": "pir-1",
            "type": "device_type.pir",
            "name": "Hall",
            "status_open": [],
            "status_motion": 1
        }))
        .unwrap();
        assert_eq!(device.status_motion.as_deref(), Some("1"));
    }

    #[test]
    fn mode_form_encodes_like_the_web_client() {
        let form = ModeForm::new(1, PanelMode::Arm, 1234);
        let encoded = serde_json::to_value(&form).unwrap();
        assert_eq!(
            encoded,
            json!({ "area": 1, "pincode": 1234, "mode": "arm", "format": 1 })
        );
    }
}
