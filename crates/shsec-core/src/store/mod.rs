// ── Snapshot store ──
//
// Holds the latest poll result and publishes every replacement through
// a `watch` channel.

mod data_store;
mod refresh;

pub use data_store::{DataStore, Snapshot};
