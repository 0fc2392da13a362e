// ── Poll result application ──

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use super::{DataStore, Snapshot};
use crate::model::{Area, Device};

impl DataStore {
    /// Replace the snapshot with the result of a successful poll.
    ///
    /// Both maps are built before anything is published. A device id
    /// that appears twice keeps its last record.
    pub(crate) fn apply_refresh(&self, devices: Vec<Device>, areas: Vec<Area>) {
        let devices: BTreeMap<String, Arc<Device>> = devices
            .into_iter()
            .map(|d| (d.id.clone(), Arc::new(d)))
            .collect();
        let areas: BTreeMap<String, Arc<Area>> = areas
            .into_iter()
            .map(|a| (a.id.clone(), Arc::new(a)))
            .collect();

        self.snapshot.send_replace(Arc::new(Snapshot {
            devices,
            areas,
            refreshed_at: Some(Utc::now()),
            available: true,
            last_error: None,
        }));
    }

    /// Keep the last data but flag it as stale.
    pub(crate) fn mark_unavailable(&self, reason: String) {
        self.snapshot.send_modify(|current| {
            let mut next = Snapshot::clone(current);
            next.available = false;
            next.last_error = Some(reason);
            *current = Arc::new(next);
        });
    }

    /// Drop all data, e.g. after disconnecting.
    pub(crate) fn clear(&self) {
        self.snapshot.send_replace(Arc::new(Snapshot::default()));
    }
}
