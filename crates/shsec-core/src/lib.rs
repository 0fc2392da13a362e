// shsec-core: Polling coordinator and typed read model between shsec-api and consumers (CLI).

pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{CoordinatorConfig, TlsVerification};
pub use coordinator::{ConnectionState, Coordinator};
pub use error::CoreError;
pub use store::{DataStore, Snapshot};

pub use model::{
    AlarmMode, AlarmPanel, AlarmState, Area, BinarySensor, Device, DeviceType, SensorClass,
};
