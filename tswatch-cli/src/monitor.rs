//! Printing sensor readings as the coordinator publishes updates.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tswatch_coordinator::{Coordinator, Update};
use tswatch_types::Snapshot;
use tswatch_webquery::{ConnectionDescriptor, ServerQuery};

use crate::sensors::{device_info, readings, render};

/// How readings are written.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per sensor
    #[default]
    Text,
    /// One JSON object per update
    Json,
}

/// Render one snapshot in the chosen format.
pub fn format_snapshot(
    snapshot: &Snapshot,
    descriptor: &ConnectionDescriptor,
    format: OutputFormat,
) -> Result<String> {
    let device = device_info(snapshot, descriptor);
    let readings = readings(snapshot);
    match format {
        OutputFormat::Text => Ok(render(&device, &readings)),
        OutputFormat::Json => Ok(serde_json::to_string(&json!({
            "timestamp_ms": snapshot.timestamp_ms,
            "device": device,
            "sensors": readings,
        }))? + "\n"),
    }
}

/// Build a coordinator and wait for its first successful refresh.
///
/// Polling is not started; the host is not ready until this returns `Ok`.
pub async fn connect<Q: ServerQuery>(
    query: Q,
    interval: Duration,
) -> Result<(Coordinator<Q>, Arc<Snapshot>)> {
    let coordinator = Coordinator::builder(query).interval(interval).build();
    let snapshot = coordinator
        .first_refresh()
        .await
        .context("Unable to connect to TeamSpeak server")?;
    Ok((coordinator, snapshot))
}

/// Print every fresh snapshot until `shutdown` resolves.
///
/// Connectivity failures are logged and polling carries on. An
/// authentication failure ends the loop with an error, since it will not
/// fix itself. Updates already delivered when `shutdown` resolves are still
/// written out.
pub async fn follow<Q, W, S>(
    coordinator: &Coordinator<Q>,
    descriptor: &ConnectionDescriptor,
    format: OutputFormat,
    out: &mut W,
    shutdown: S,
) -> Result<()>
where
    Q: ServerQuery + 'static,
    W: Write,
    S: Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = coordinator.subscribe(move |update| {
        let _ = tx.send(update.clone());
    });
    let polling = coordinator.start();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else {
                    break Ok(());
                };
                if let Err(err) = emit(update, descriptor, format, out) {
                    break Err(err);
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                let mut drained = Ok(());
                while let Ok(update) = rx.try_recv() {
                    drained = emit(update, descriptor, format, out);
                    if drained.is_err() {
                        break;
                    }
                }
                break drained;
            }
        }
    };

    coordinator.unsubscribe(subscription);
    polling.shutdown().await;
    result
}

fn emit<W: Write>(
    update: Update,
    descriptor: &ConnectionDescriptor,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    match update {
        Update::Fresh(snapshot) => {
            out.write_all(format_snapshot(&snapshot, descriptor, format)?.as_bytes())?;
            out.flush()?;
            Ok(())
        }
        Update::Stale(msg) => {
            warn!("Server data may be stale: {}", msg);
            Ok(())
        }
        Update::AuthFailed(msg) => Err(anyhow!(
            "Authentication failed ({}); fix the API key and restart",
            msg
        )),
    }
}

/// Write a snapshot to a JSON file.
pub fn export(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
