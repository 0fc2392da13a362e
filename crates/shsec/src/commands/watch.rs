//! Long-running host: keeps the coordinator connected (periodic poll plus
//! push-triggered refreshes) and prints every published snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shsec_core::{Coordinator, CoordinatorConfig};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct WatchUpdate {
    refreshed_at: Option<DateTime<Utc>>,
    available: bool,
    panels: Vec<EntityState>,
    sensors: Vec<EntityState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

#[derive(Debug, Serialize)]
struct EntityState {
    name: String,
    state: &'static str,
}

fn collect(coordinator: &Coordinator) -> WatchUpdate {
    let snap = coordinator.snapshot();
    WatchUpdate {
        refreshed_at: snap.refreshed_at,
        available: snap.available,
        panels: coordinator
            .alarm_panels()
            .iter()
            .map(|p| EntityState {
                name: p.name.clone(),
                state: p.state_label(),
            })
            .collect(),
        sensors: coordinator
            .binary_sensors()
            .iter()
            .map(|s| EntityState {
                name: s.name.clone(),
                state: s.state(),
            })
            .collect(),
        last_error: snap.last_error.clone(),
    }
}

fn line(update: &WatchUpdate, color: bool) -> String {
    let at = update
        .refreshed_at
        .map_or_else(|| "--:--:--".into(), |t| t.format("%H:%M:%S").to_string());
    let entities: Vec<String> = update
        .panels
        .iter()
        .chain(&update.sensors)
        .map(|e| format!("{}: {}", e.name, output::paint_state(e.state, color)))
        .collect();
    let mut out = format!("[{at}] {}", entities.join(" | "));
    if let Some(err) = &update.last_error {
        out.push_str(&format!("  ({err})"));
    }
    out
}

pub async fn handle(
    mut config: CoordinatorConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(interval) = args.interval {
        config.refresh_interval_secs = interval;
    }
    if args.no_push {
        config.push_enabled = false;
    }

    let coordinator = Coordinator::new(config);
    coordinator.connect().await?;

    let mut snapshots = coordinator.subscribe();
    let mut states = coordinator.connection_state();
    let color = output::should_color(&global.color);
    // Keep one update per line when streaming JSON
    let format = match global.output {
        OutputFormat::Json => OutputFormat::JsonCompact,
        ref other => other.clone(),
    };

    let mut seen = 0usize;
    let emit = |seen: &mut usize| {
        let update = collect(&coordinator);
        let out = output::render_single(&format, &update, |u| line(u, color), |u| line(u, false));
        output::print_output(&out, global.quiet);
        *seen += 1;
    };

    emit(&mut seen);
    snapshots.borrow_and_update();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while args.count.is_none_or(|n| seen < n) {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                snapshots.borrow_and_update();
                emit(&mut seen);
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().to_string();
                tracing::info!(%state, "connection state changed");
            }
        }
    }

    coordinator.disconnect().await;
    Ok(())
}
