// ── Central snapshot store ──
//
// The device and area maps of one poll travel together in an immutable
// `Snapshot`. Readers clone an `Arc`; writers swap the whole snapshot,
// so a consumer never sees devices from one poll next to areas from
// another.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::model::{Area, Device};

/// Everything known after the most recent poll.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Keyed by device id.
    pub devices: BTreeMap<String, Arc<Device>>,
    /// Keyed by area id in string form.
    pub areas: BTreeMap<String, Arc<Area>>,
    /// When the data was fetched. `None` before the first successful poll.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// `false` once a poll has failed; the data is then stale.
    pub available: bool,
    /// Reason of the last failed poll, cleared by the next success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Reactive store for the current [`Snapshot`].
pub struct DataStore {
    pub(crate) snapshot: watch::Sender<Arc<Snapshot>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        Self { snapshot }
    }

    /// The current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.subscribe()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn device(&self, id: &str) -> Option<Arc<Device>> {
        self.snapshot.borrow().devices.get(id).cloned()
    }

    pub fn area(&self, id: &str) -> Option<Arc<Area>> {
        self.snapshot.borrow().areas.get(id).cloned()
    }

    // ── Counts & metadata ────────────────────────────────────────────

    pub fn device_count(&self) -> usize {
        self.snapshot.borrow().devices.len()
    }

    pub fn area_count(&self) -> usize {
        self.snapshot.borrow().areas.len()
    }

    pub fn is_available(&self) -> bool {
        self.snapshot.borrow().available
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.snapshot.borrow().refreshed_at
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
