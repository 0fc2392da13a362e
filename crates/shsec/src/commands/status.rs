//! Installation summary.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use shsec_core::{Coordinator, CoordinatorConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StatusView {
    installation: String,
    username: String,
    available: bool,
    refreshed_at: Option<DateTime<Utc>>,
    devices: usize,
    areas: usize,
    open_sensors: Vec<String>,
    panels: Vec<PanelSummary>,
}

#[derive(Debug, Serialize)]
struct PanelSummary {
    area: String,
    state: &'static str,
}

fn detail(view: &StatusView, color: bool) -> String {
    let mut out = String::new();
    let refreshed = view
        .refreshed_at
        .map_or_else(|| "never".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    let _ = writeln!(out, "Installation:  {}", view.installation);
    let _ = writeln!(out, "Account:       {}", view.username);
    let _ = writeln!(out, "Refreshed:     {refreshed}");
    let _ = writeln!(out, "Devices:       {}", view.devices);
    let _ = writeln!(out, "Areas:         {}", view.areas);
    for panel in &view.panels {
        let _ = writeln!(
            out,
            "Area {:<8}   {}",
            panel.area,
            output::paint_state(panel.state, color)
        );
    }
    if view.open_sensors.is_empty() {
        let _ = write!(out, "Open sensors:  none");
    } else {
        let _ = write!(out, "Open sensors:  {}", view.open_sensors.join(", "));
    }
    out
}

pub async fn handle(config: CoordinatorConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let view = Coordinator::oneshot(config, |c| async move {
        let snap = c.snapshot();
        let open_sensors = c
            .binary_sensors()
            .into_iter()
            .filter(|s| s.is_on == Some(true))
            .map(|s| s.name)
            .collect();
        let panels = c
            .alarm_panels()
            .iter()
            .map(|p| PanelSummary {
                area: p.area.clone(),
                state: p.state_label(),
            })
            .collect();

        Ok(StatusView {
            installation: c.config().name.clone(),
            username: c.config().username.clone(),
            available: snap.available,
            refreshed_at: snap.refreshed_at,
            devices: snap.devices.len(),
            areas: snap.areas.len(),
            open_sensors,
            panels,
        })
    })
    .await?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, color),
        |v| v.installation.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
