// ── Domain model ──
//
// Canonical representation of what the panel reports, independent of
// the wire format, plus the entity views derived from it.

pub mod alarm;
pub mod device;
pub mod entity;

pub use alarm::{AlarmMode, AlarmState, Area};
pub use device::{Device, DeviceType, SensorClass};
pub use entity::{AlarmFeature, AlarmPanel, BinarySensor, CodeFormat};
