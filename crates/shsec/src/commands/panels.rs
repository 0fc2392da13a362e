//! Alarm panel listing.

use tabled::Tabled;

use shsec_core::{AlarmPanel, Coordinator, CoordinatorConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PanelRow {
    #[tabled(rename = "Area")]
    area: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "State")]
    state: String,
}

impl PanelRow {
    fn new(p: &AlarmPanel, color: bool) -> Self {
        Self {
            area: p.area.clone(),
            name: p.name.clone(),
            mode: p.mode.to_string(),
            state: output::paint_state(p.state_label(), color),
        }
    }
}

pub async fn handle(config: CoordinatorConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let panels = Coordinator::oneshot(config, |c| async move { Ok(c.alarm_panels()) }).await?;

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &panels,
        |p| PanelRow::new(p, color),
        |p| format!("{}\t{}", p.area, p.state_label()),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
