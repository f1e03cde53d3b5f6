use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use beamtail_config::AppConfig;
use beamtail_mux::{Acceptor, EventBus, LabelRegistry, Shutdown};
use beamtail_store::LogStore;
use beamtail_view::LabelStyle;

mod consumer;
mod logger;
mod roster;

use consumer::Consumer;

const DEFAULT_WIDTH: usize = 120;
const DEFAULT_HEIGHT: usize = 40;

/// Viewport from `COLUMNS` / `LINES`, falling back to 120x40
fn viewport() -> (usize, usize) {
    let dimension = |name: &str, default: usize| {
        std::env::var(name)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(default)
    };
    (
        dimension("COLUMNS", DEFAULT_WIDTH),
        dimension("LINES", DEFAULT_HEIGHT),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = logger::init();
    log::info!("Starting beamtail (log file {:?})", log_file);

    let config = AppConfig::load();
    let addr = config.listen_addr()?;

    let (bus, mut receiver) = EventBus::new(config.message_queue_capacity);
    let registry = Arc::new(LabelRegistry::new());
    let acceptor = Acceptor::bind(&addr, registry, bus, config.handshake_timeout())
        .await
        .with_context(|| format!("Failed to listen on {}", addr))?;

    let bound = acceptor.local_addr().context("Failed to read bound address")?;
    eprintln!("beamtail listening on {}", bound);

    let shutdown = Shutdown::new();
    let accept_loop = tokio::spawn(acceptor.run(shutdown.clone()));

    let store = Arc::new(LogStore::with_capacity(config.store_capacity));
    let style = LabelStyle::new(config.color_labels, config.label_separator.clone());
    let (width, height) = viewport();
    let mut consumer = Consumer::new(store, style, width, height, io::stdout());

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                log::error!("Failed to listen for Ctrl-C: {}", e);
            }
            log::info!("Interrupted, shutting down");
        }
        result = consumer.run(&mut receiver) => {
            if let Err(e) = result {
                log::error!("Writing the tail failed: {}", e);
            }
        }
    }

    let roster = consumer.roster();
    log::info!(
        "{} beams seen, {} still connected, tail at record {}",
        roster.all().len(),
        roster.active_count(),
        consumer.pager().window_start()
    );

    shutdown.trigger();
    if let Err(e) = accept_loop.await {
        log::error!("Accept loop panicked: {}", e);
    }

    log::info!("Exiting beamtail");
    Ok(())
}
