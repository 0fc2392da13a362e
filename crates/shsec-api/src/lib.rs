// shsec-api: Async Rust client for the SmartHomeSec cloud (REST session + push channel)

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
mod panel;
pub mod push;
pub mod transport;

pub use auth::{Credentials, Session, hash_password};
pub use client::SessionClient;
pub use error::Error;
pub use models::{AreaStatus, DeviceStatus, PanelMode, PanelStatus};
pub use push::{ChannelId, Frame, PushChannel, PushConfig, PushEvent};
pub use transport::{Endpoints, TlsMode, TransportConfig};
