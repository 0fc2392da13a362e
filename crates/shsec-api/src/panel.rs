// Panel endpoints
//
// Poll the combined device/area snapshot and change an area's arming
// mode. Both go through the session-aware request helpers.

use serde_json::Value;
use tracing::debug;

use crate::client::SessionClient;
use crate::error::Error;
use crate::models::{CycleResponse, ModeForm, PanelMode, PanelStatus};

impl SessionClient {
    /// Fetch every device and area in one call.
    ///
    /// `GET panel/cycle`
    pub async fn panel_cycle(&self) -> Result<PanelStatus, Error> {
        let resp: CycleResponse = self.get("panel/cycle").await?;
        debug!(
            devices = resp.data.device_status.len(),
            areas = resp.data.model.len(),
            "panel cycle"
        );
        Ok(resp.data)
    }

    /// Change the arming mode of `area`, authorized by the user's pincode.
    ///
    /// `POST panel/mode`. Returns the panel's raw acknowledgement; the new
    /// mode becomes visible with the next [`panel_cycle`](Self::panel_cycle).
    pub async fn set_panel_mode(
        &self,
        area: u32,
        mode: PanelMode,
        pincode: u32,
    ) -> Result<Value, Error> {
        debug!(area, %mode, "setting panel mode");
        self.post("panel/mode", &ModeForm::new(area, mode, pincode))
            .await
    }
}
