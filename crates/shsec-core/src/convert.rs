// ── API-to-domain type conversions ──
//
// Bridges raw `shsec_api` wire types into canonical `shsec_core::model`
// types. Ids are already normalized to strings by the wire layer.

use shsec_api::models::{AreaStatus, DeviceStatus, PanelMode};

use crate::model::{AlarmMode, Area, Device, DeviceType};

// ── Device ─────────────────────────────────────────────────────────

impl From<DeviceStatus> for Device {
    fn from(raw: DeviceStatus) -> Self {
        Self {
            device_type: DeviceType::from_vendor(&raw.device_type),
            id: raw.device_id,
            name: raw.name,
            status_open: raw.status_open,
            status_motion: raw.status_motion,
            attributes: raw.extra,
        }
    }
}

// ── Area ───────────────────────────────────────────────────────────

impl From<AreaStatus> for Area {
    fn from(raw: AreaStatus) -> Self {
        Self {
            id: raw.area,
            mode: raw.mode.into(),
            attributes: raw.extra,
        }
    }
}

impl From<PanelMode> for AlarmMode {
    fn from(mode: PanelMode) -> Self {
        match mode {
            PanelMode::Disarm => Self::Disarm,
            PanelMode::Arm => Self::Arm,
            PanelMode::Home => Self::Home,
            PanelMode::Triggered => Self::Triggered,
            PanelMode::Unknown => Self::Unknown,
        }
    }
}

impl From<AlarmMode> for PanelMode {
    fn from(mode: AlarmMode) -> Self {
        match mode {
            AlarmMode::Disarm => Self::Disarm,
            AlarmMode::Arm => Self::Arm,
            AlarmMode::Home => Self::Home,
            AlarmMode::Triggered => Self::Triggered,
            AlarmMode::Unknown => Self::Unknown,
        }
    }
}
