//! A real-time observability agent for a set of watched validators on an
//! Ethereum beacon chain: consumes the node's block SSE stream and, for
//! each slot, reconciles the duties owed against the outcomes observed.

pub mod beacon;
pub mod bitfield;
pub mod config;
pub mod engine;
pub mod error;
pub mod key_source;
pub mod liveness_file;
pub mod metrics;
pub mod notifier;
pub mod types;

use crate::beacon::BeaconNodeClient;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Error;
use crate::notifier::Notifier;
use crate::types::BLOCK_NOT_ORPHANED_TIME;
use slog::{info, o, warn, Drain, Logger};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

fn build_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

/// Top-level orchestration: builds the shared collaborators, spawns the
/// metrics server, and drives the SSE loop until shutdown or an
/// unrecoverable transport error.
pub async fn run(config: Config) -> Result<(), Error> {
    let log = build_logger();
    metrics::init();

    info!(log, "starting validator watcher"; "beacon_url" => config.beacon_url.as_str());

    let beacon = Arc::new(BeaconNodeClient::new(config.beacon_url.clone(), log.clone()));
    let notifier = Notifier::new(log.clone(), config.slack_channel.clone(), config.slack_token.clone());
    let signer_urls: HashSet<_> = config.web3signer_urls.iter().cloned().collect();

    metrics::spawn_server(config.metrics_port, log.clone());

    let mut engine = Engine::new(
        beacon.clone(),
        notifier,
        log.clone(),
        config.pubkeys_file_path.clone(),
        signer_urls,
    )
    .await?;

    let mut stream = beacon::BlockEventStream::new(&config.beacon_url, log.clone());

    loop {
        tokio::select! {
            event = stream.next_event() => {
                let envelope = event?;
                let slot = envelope.slot;
                let t0 = Instant::now();

                // Key refresh, liveness check, and future-proposal
                // pre-announcement run before the grace sleep, per spec
                // §4.4.5 — they don't depend on this slot's block.
                engine.handle_epoch_boundary(slot).await;

                let grace = BLOCK_NOT_ORPHANED_TIME.saturating_sub(t0.elapsed());
                if !grace.is_zero() {
                    tokio::time::sleep(grace).await;
                }

                let block = match beacon.get_block(slot).await {
                    Ok(block) => block,
                    Err(e) => {
                        warn!(log, "failed to fetch block, treating slot as unknown"; "slot" => slot.as_u64(), "error" => e.to_string());
                        None
                    }
                };

                engine.finish_slot(slot, block.as_ref()).await;

                if let Some(path) = &config.liveness_file {
                    if let Some(last_slot) = engine.last_slot() {
                        if let Err(e) = liveness_file::touch(path, last_slot).await {
                            warn!(log, "failed to touch liveness file"; "error" => e.to_string());
                        }
                    }
                }
            }
            _ = shutdown_signal() => {
                info!(log, "shutdown signal received, exiting");
                return Ok(());
            }
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
