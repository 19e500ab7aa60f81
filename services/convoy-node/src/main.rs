use anyhow::Context;
use convoy_core::{logging, Config};
use convoy_network::{InMemorySegmentStore, SegmentRepository};
use convoy_node::{MissionControl, MovementSimulator};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const NODE_PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct NodeVersionHandshake {
    version: &'static str,
    protocol_version: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--version-json") {
        let handshake = NodeVersionHandshake {
            version: env!("CARGO_PKG_VERSION"),
            protocol_version: NODE_PROTOCOL_VERSION,
        };
        println!("{}", serde_json::to_string(&handshake)?);
        return Ok(());
    }

    let config = match parse_config_path(&args)? {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default_config(),
    };
    logging::init_from_config(&config.logging);

    let segments = match &config.network.segments_path {
        Some(path) => InMemorySegmentStore::from_json_file(path)
            .await
            .with_context(|| format!("loading segments from {}", path.display()))?,
        None => InMemorySegmentStore::new(),
    };
    let segments = Arc::new(segments);

    let (control, workers) = MissionControl::start(&config, segments.clone());
    let (simulator, time_scale) = MovementSimulator::new(
        control.convoys(),
        segments,
        control.missions(),
        &config.simulation,
    );
    let simulation = tokio::spawn(simulator.run());

    info!(
        node_id = %config.service.node_id,
        segments = control.segments().all_segments().await?.len(),
        "Convoy node running; ctrl-c to stop"
    );
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    drop(time_scale);
    simulation.await?;
    // Dropping the facade closes the queue; workers drain and exit
    drop(control);
    for worker in workers {
        worker.await?;
    }
    Ok(())
}

/// `--config <path>` wins over `CONVOY_CONFIG`; neither means built-in defaults.
fn parse_config_path(args: &[String]) -> anyhow::Result<Option<PathBuf>> {
    let mut args_iter = args.iter();
    while let Some(arg) = args_iter.next() {
        if arg == "--config" {
            let path = args_iter
                .next()
                .context("--config was provided without a path")?;
            return Ok(Some(PathBuf::from(path)));
        }
    }
    Ok(std::env::var_os("CONVOY_CONFIG").map(PathBuf::from))
}
