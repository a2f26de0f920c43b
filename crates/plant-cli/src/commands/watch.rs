//! Watch command handler
//!
//! Keeps running, reprinting the plant list whenever a plant is refreshed
//! (including at every local midnight) until interrupted.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use plant_core::daily::spawn_daily_refresh;
use plant_core::{Clock, Refresh, WateringCoordinator};

use super::Garden;
use crate::output::{Output, PlantView};

/// Watch all plants until Ctrl-C
pub async fn run(garden: &Garden, output: &Output) -> Result<()> {
    let coordinators = garden.all()?;
    if coordinators.is_empty() {
        output.message("No plants to watch. Add one with `plant add <name>`.");
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel::<(String, Refresh)>(16);
    let mut forwarders = Vec::with_capacity(coordinators.len());
    for coordinator in &coordinators {
        let mut updates = coordinator.subscribe();
        let device_id = coordinator.device_id();
        let tx = tx.clone();
        forwarders.push(tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let refresh = *updates.borrow_and_update();
                if tx.send((device_id.clone(), refresh)).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    let daily = spawn_daily_refresh(
        coordinators.clone(),
        Arc::clone(&garden.clock),
        garden.zone,
    );
    info!(plants = coordinators.len(), zone = %garden.zone, "watching plants");

    print_all(garden, &coordinators, output)?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            update = rx.recv() => {
                let Some((device_id, refresh)) = update else {
                    break;
                };
                debug!(device = %device_id, reason = ?refresh.reason, "plant refreshed");
                print_all(garden, &coordinators, output)?;
            }
        }
    }

    daily.abort();
    for forwarder in forwarders {
        forwarder.abort();
    }
    Ok(())
}

fn print_all(
    garden: &Garden,
    coordinators: &[Arc<WateringCoordinator>],
    output: &Output,
) -> Result<()> {
    let mut plants: Vec<PlantView> = Vec::with_capacity(coordinators.len());
    for coordinator in coordinators {
        if let Some(view) = garden.view(coordinator)? {
            plants.push(view);
        }
    }

    if !output.is_quiet() {
        output.message(&format!("-- {} --", garden.zone.date_of(garden.clock.now())));
    }
    output.print_plants(&plants);
    Ok(())
}
