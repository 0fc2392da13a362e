//! Binary sensor listing.

use tabled::Tabled;

use shsec_core::{BinarySensor, Coordinator, CoordinatorConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "State")]
    state: String,
}

impl SensorRow {
    fn new(s: &BinarySensor, color: bool) -> Self {
        Self {
            id: s.unique_id.clone(),
            name: s.device_name.clone(),
            class: s.class.to_string(),
            model: s.model.clone(),
            state: output::paint_state(s.state(), color),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(config: CoordinatorConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let sensors = Coordinator::oneshot(config, |c| async move { Ok(c.binary_sensors()) }).await?;

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &sensors,
        |s| SensorRow::new(s, color),
        |s| format!("{}\t{}", s.name, s.state()),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
